//! # Domain Records
//!
//! Contacts and everything attached to them: notes, activities, relationships
//! and reminders. Each record has an `*Input` counterpart used for create and
//! partial-update payloads; absent input fields leave stored values untouched.
//!
//! - **Version**: 1.3.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.3.0: Reminders gain recurrence and completion-based rescheduling
//! - 1.2.0: Activities can involve several contacts
//! - 1.1.0: Circles stored as a JSON array
//! - 1.0.0: Initial contact, note and relationship records

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::OnceLock;

use super::birthday::Birthday;
use super::error::ValidationError;

fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email))
}

/// Keeps an explicit `null` distinct from an absent field: absent stays `None`
/// through `#[serde(default)]`, `null` becomes `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn require(value: &str, message: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new(message))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub nickname: String,
    pub gender: String,
    pub email: String,
    pub phone: String,
    pub birthday: Option<Birthday>,
    pub photo: String,
    pub address: String,
    pub how_we_met: String,
    pub food_preference: String,
    pub work_information: String,
    pub contact_information: String,
    pub circles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<Note>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activities: Option<Vec<Activity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Vec<Relationship>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminders: Option<Vec<Reminder>>,
}

impl Contact {
    /// First and last name joined, without stray whitespace when either is blank.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname.trim(), self.lastname.trim())
            .trim()
            .to_string()
    }

    /// How the contact is addressed informally: nickname, falling back to first name.
    pub fn display_nickname(&self) -> &str {
        if self.nickname.trim().is_empty() {
            &self.firstname
        } else {
            &self.nickname
        }
    }
}

/// Create/update payload for a contact.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactInput {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub nickname: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// `null` clears a stored birthday
    #[serde(deserialize_with = "nullable")]
    pub birthday: Option<Option<Birthday>>,
    pub photo: Option<String>,
    pub address: Option<String>,
    pub how_we_met: Option<String>,
    pub food_preference: Option<String>,
    pub work_information: Option<String>,
    pub contact_information: Option<String>,
    pub circles: Option<Vec<String>>,
}

impl ContactInput {
    /// Build a new, not yet stored contact (id 0).
    pub fn into_new_contact(self) -> Result<Contact, ValidationError> {
        let mut contact = Contact {
            id: 0,
            firstname: String::new(),
            lastname: String::new(),
            nickname: String::new(),
            gender: String::new(),
            email: String::new(),
            phone: String::new(),
            birthday: None,
            photo: String::new(),
            address: String::new(),
            how_we_met: String::new(),
            food_preference: String::new(),
            work_information: String::new(),
            contact_information: String::new(),
            circles: Vec::new(),
            notes: None,
            activities: None,
            relationships: None,
            reminders: None,
        };
        self.apply_to(&mut contact)?;
        Ok(contact)
    }

    /// Overlay the present fields onto `contact` and re-validate it.
    pub fn apply_to(self, contact: &mut Contact) -> Result<(), ValidationError> {
        let fields = [
            (self.firstname, &mut contact.firstname),
            (self.lastname, &mut contact.lastname),
            (self.nickname, &mut contact.nickname),
            (self.gender, &mut contact.gender),
            (self.email, &mut contact.email),
            (self.phone, &mut contact.phone),
            (self.photo, &mut contact.photo),
            (self.address, &mut contact.address),
            (self.how_we_met, &mut contact.how_we_met),
            (self.food_preference, &mut contact.food_preference),
            (self.work_information, &mut contact.work_information),
            (self.contact_information, &mut contact.contact_information),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value.trim().to_string();
            }
        }
        if let Some(birthday) = self.birthday {
            contact.birthday = birthday;
        }
        if let Some(circles) = self.circles {
            contact.circles = normalize_circles(circles);
        }

        require(&contact.firstname, "firstname is required")?;
        if !contact.email.is_empty() && !is_valid_email(&contact.email) {
            return Err(ValidationError::new(format!(
                "Invalid email address: {}",
                contact.email
            )));
        }
        Ok(())
    }
}

/// Trim, drop empties and de-duplicate while keeping first-seen order.
fn normalize_circles(circles: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(circles.len());
    for circle in circles {
        let circle = circle.trim().to_string();
        if !circle.is_empty() && !out.contains(&circle) {
            out.push(circle);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub contact_id: i64,
    pub content: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NoteInput {
    pub content: Option<String>,
    pub date: Option<NaiveDate>,
}

impl NoteInput {
    pub fn into_new_note(self, contact_id: i64, today: NaiveDate) -> Result<Note, ValidationError> {
        let mut note = Note {
            id: 0,
            contact_id,
            content: String::new(),
            date: today,
        };
        self.apply_to(&mut note)?;
        Ok(note)
    }

    pub fn apply_to(self, note: &mut Note) -> Result<(), ValidationError> {
        if let Some(content) = self.content {
            note.content = content;
        }
        if let Some(date) = self.date {
            note.date = date;
        }
        require(&note.content, "content is required")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub location: String,
    pub date: NaiveDate,
    pub contact_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActivityInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
    pub contact_ids: Option<Vec<i64>>,
}

impl ActivityInput {
    /// New activity for `contact_id`; any extra `contact_ids` are kept alongside it.
    pub fn into_new_activity(
        self,
        contact_id: i64,
        today: NaiveDate,
    ) -> Result<Activity, ValidationError> {
        let mut activity = Activity {
            id: 0,
            title: String::new(),
            description: String::new(),
            location: String::new(),
            date: today,
            contact_ids: vec![contact_id],
        };
        self.apply_to(&mut activity)?;
        if !activity.contact_ids.contains(&contact_id) {
            activity.contact_ids.push(contact_id);
            activity.contact_ids.sort_unstable();
        }
        Ok(activity)
    }

    pub fn apply_to(self, activity: &mut Activity) -> Result<(), ValidationError> {
        if let Some(title) = self.title {
            activity.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            activity.description = description;
        }
        if let Some(location) = self.location {
            activity.location = location.trim().to_string();
        }
        if let Some(date) = self.date {
            activity.date = date;
        }
        if let Some(mut ids) = self.contact_ids {
            ids.sort_unstable();
            ids.dedup();
            activity.contact_ids = ids;
        }
        require(&activity.title, "title is required")?;
        if activity.contact_ids.is_empty() {
            return Err(ValidationError::new(
                "an activity needs at least one contact",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: i64,
    pub contact_id: i64,
    pub name: String,
    pub relationship_type: String,
    pub gender: String,
    pub related_contact_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelationshipInput {
    pub name: Option<String>,
    pub relationship_type: Option<String>,
    pub gender: Option<String>,
    /// `null` unlinks the related contact
    #[serde(deserialize_with = "nullable")]
    pub related_contact_id: Option<Option<i64>>,
}

impl RelationshipInput {
    pub fn into_new_relationship(self, contact_id: i64) -> Result<Relationship, ValidationError> {
        let mut relationship = Relationship {
            id: 0,
            contact_id,
            name: String::new(),
            relationship_type: String::new(),
            gender: String::new(),
            related_contact_id: None,
        };
        self.apply_to(&mut relationship)?;
        Ok(relationship)
    }

    pub fn apply_to(self, relationship: &mut Relationship) -> Result<(), ValidationError> {
        if let Some(name) = self.name {
            relationship.name = name.trim().to_string();
        }
        if let Some(kind) = self.relationship_type {
            relationship.relationship_type = kind.trim().to_string();
        }
        if let Some(gender) = self.gender {
            relationship.gender = gender.trim().to_string();
        }
        if let Some(related) = self.related_contact_id {
            relationship.related_contact_id = related;
        }
        require(&relationship.relationship_type, "relationship_type is required")?;
        if relationship.name.is_empty() && relationship.related_contact_id.is_none() {
            return Err(ValidationError::new(
                "a relationship needs a name or a related contact",
            ));
        }
        if relationship.related_contact_id == Some(relationship.contact_id) {
            return Err(ValidationError::new(
                "a contact cannot be related to itself",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    Once,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recurrence::Once => write!(f, "once"),
            Recurrence::Daily => write!(f, "daily"),
            Recurrence::Weekly => write!(f, "weekly"),
            Recurrence::Monthly => write!(f, "monthly"),
            Recurrence::Yearly => write!(f, "yearly"),
        }
    }
}

impl std::str::FromStr for Recurrence {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "once" => Ok(Recurrence::Once),
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "monthly" => Ok(Recurrence::Monthly),
            "yearly" => Ok(Recurrence::Yearly),
            _ => Err(anyhow::anyhow!("Invalid recurrence: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub contact_id: i64,
    pub message: String,
    /// Next time the reminder is due, whole seconds
    pub date: DateTime<Utc>,
    pub by_mail: bool,
    pub recurrence: Recurrence,
    pub reoccur_from_completion: bool,
    pub completed: bool,
    pub last_sent: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReminderInput {
    pub message: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub by_mail: Option<bool>,
    pub recurrence: Option<Recurrence>,
    pub reoccur_from_completion: Option<bool>,
    pub completed: Option<bool>,
}

impl ReminderInput {
    pub fn into_new_reminder(self, contact_id: i64) -> Result<Reminder, ValidationError> {
        let date = self
            .date
            .ok_or_else(|| ValidationError::new("date is required"))?
            .trunc_subsecs(0);
        let mut reminder = Reminder {
            id: 0,
            contact_id,
            message: String::new(),
            date,
            by_mail: false,
            recurrence: Recurrence::Once,
            reoccur_from_completion: false,
            completed: false,
            last_sent: None,
        };
        self.apply_to(&mut reminder)?;
        Ok(reminder)
    }

    pub fn apply_to(self, reminder: &mut Reminder) -> Result<(), ValidationError> {
        if let Some(message) = self.message {
            reminder.message = message;
        }
        if let Some(date) = self.date {
            reminder.date = date.trunc_subsecs(0);
        }
        if let Some(by_mail) = self.by_mail {
            reminder.by_mail = by_mail;
        }
        if let Some(recurrence) = self.recurrence {
            reminder.recurrence = recurrence;
        }
        if let Some(flag) = self.reoccur_from_completion {
            reminder.reoccur_from_completion = flag;
        }
        if let Some(completed) = self.completed {
            reminder.completed = completed;
        }
        require(&reminder.message, "message is required")
    }
}
