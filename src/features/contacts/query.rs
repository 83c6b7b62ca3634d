//! Contact listing query builder
//!
//! Turns loosely-typed query-string parameters into a validated [`ContactQuery`]
//! and renders it as parameterized SQL. Column names only ever come from
//! [`CONTACT_FIELDS`]; user text is always bound, never spliced.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.1.0: Circle filter matches whole tags instead of substrings
//! - 1.0.0: Initial release with field selection, includes, search and pagination

use serde::Deserialize;
use sqlite::Value;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 25;
pub const MAX_LIMIT: i64 = 100;

/// Contact columns a client may select.
pub const CONTACT_FIELDS: &[&str] = &[
    "firstname",
    "lastname",
    "nickname",
    "gender",
    "email",
    "phone",
    "birthday",
    "address",
    "how_we_met",
    "food_preference",
    "work_information",
    "contact_information",
    "circles",
];

/// Collections that can be preloaded alongside each contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Include {
    Notes,
    Activities,
    Relationships,
    Reminders,
}

impl Include {
    pub const ALL: [Include; 4] = [
        Include::Notes,
        Include::Activities,
        Include::Relationships,
        Include::Reminders,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Include::Notes => "notes",
            Include::Activities => "activities",
            Include::Relationships => "relationships",
            Include::Reminders => "reminders",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Include::ALL.into_iter().find(|i| i.key() == name)
    }
}

/// Raw `GET /api/contacts` query string. Numbers stay strings so bad input
/// falls back to defaults instead of failing the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub fields: Option<String>,
    pub includes: Option<String>,
    pub search: Option<String>,
    pub circle: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactQuery {
    pub page: i64,
    pub limit: i64,
    /// Selected columns besides `id`, in whitelist order
    pub fields: Vec<&'static str>,
    pub includes: Vec<Include>,
    pub search: Option<String>,
    pub circle: Option<String>,
}

impl Default for ContactQuery {
    fn default() -> Self {
        ContactQuery::from_params(&ListParams::default())
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_number(value: &Option<String>) -> Option<i64> {
    value.as_deref().and_then(|v| v.trim().parse::<i64>().ok())
}

impl ContactQuery {
    pub fn from_params(params: &ListParams) -> Self {
        let page = parse_number(&params.page)
            .filter(|p| *p >= 1)
            .unwrap_or(DEFAULT_PAGE);
        let limit = parse_number(&params.limit)
            .filter(|l| (1..=MAX_LIMIT).contains(l))
            .unwrap_or(DEFAULT_LIMIT);

        let fields = match non_blank(&params.fields) {
            Some(requested) => {
                let requested: Vec<&str> = requested.split(',').map(str::trim).collect();
                CONTACT_FIELDS
                    .iter()
                    .copied()
                    .filter(|field| requested.contains(field))
                    .collect()
            }
            None => CONTACT_FIELDS.to_vec(),
        };

        let requested_includes: Vec<Include> = params
            .includes
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(|name| Include::parse(name.trim()))
            .collect();
        let includes = Include::ALL
            .into_iter()
            .filter(|i| requested_includes.contains(i))
            .collect();

        ContactQuery {
            page,
            limit,
            fields,
            includes,
            search: non_blank(&params.search),
            circle: non_blank(&params.circle),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn includes(&self, include: Include) -> bool {
        self.includes.contains(&include)
    }

    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        if let Some(search) = &self.search {
            let pattern = format!("%{}%", escape_like(search));
            conditions.push(
                "(firstname LIKE ? ESCAPE '\\' OR lastname LIKE ? ESCAPE '\\' \
                 OR nickname LIKE ? ESCAPE '\\')"
                    .to_string(),
            );
            for _ in 0..3 {
                values.push(Value::String(pattern.clone()));
            }
        }

        if let Some(circle) = &self.circle {
            conditions.push(
                "EXISTS (SELECT 1 FROM json_each(contacts.circles) \
                 WHERE json_each.value = ?)"
                    .to_string(),
            );
            values.push(Value::String(circle.clone()));
        }

        if conditions.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), values)
        }
    }

    /// One page of contacts, ordered by id.
    pub fn select_sql(&self) -> (String, Vec<Value>) {
        let mut columns = vec!["id"];
        columns.extend(self.fields.iter().copied());
        let (where_sql, mut values) = self.where_clause();
        let sql = format!(
            "SELECT {} FROM contacts{where_sql} ORDER BY id LIMIT ? OFFSET ?",
            columns.join(", ")
        );
        values.push(Value::Integer(self.limit));
        values.push(Value::Integer(self.offset()));
        (sql, values)
    }

    /// Total number of contacts matching the filters, ignoring pagination.
    pub fn count_sql(&self) -> (String, Vec<Value>) {
        let (where_sql, values) = self.where_clause();
        (format!("SELECT COUNT(*) FROM contacts{where_sql}"), values)
    }
}

/// Escape LIKE wildcards so search text matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        let mut p = ListParams::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "page" => p.page = value,
                "limit" => p.limit = value,
                "fields" => p.fields = value,
                "includes" => p.includes = value,
                "search" => p.search = value,
                "circle" => p.circle = value,
                _ => unreachable!(),
            }
        }
        p
    }

    #[test]
    fn test_defaults() {
        let q = ContactQuery::default();
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 25);
        assert_eq!(q.offset(), 0);
        assert_eq!(q.fields, CONTACT_FIELDS.to_vec());
        assert!(q.includes.is_empty());
        assert!(q.search.is_none());
    }

    #[test]
    fn test_pagination_bounds() {
        let q = ContactQuery::from_params(&params(&[("page", "3"), ("limit", "10")]));
        assert_eq!((q.page, q.limit, q.offset()), (3, 10, 20));

        let q = ContactQuery::from_params(&params(&[("page", "0"), ("limit", "101")]));
        assert_eq!((q.page, q.limit), (1, 25));

        let q = ContactQuery::from_params(&params(&[("page", "-4"), ("limit", "0")]));
        assert_eq!((q.page, q.limit), (1, 25));

        let q = ContactQuery::from_params(&params(&[("page", "abc"), ("limit", "1.5")]));
        assert_eq!((q.page, q.limit), (1, 25));

        let q = ContactQuery::from_params(&params(&[("limit", "100")]));
        assert_eq!(q.limit, 100);
    }

    #[test]
    fn test_field_whitelist() {
        let q = ContactQuery::from_params(&params(&[(
            "fields",
            "email, firstname,password,firstname",
        )]));
        assert_eq!(q.fields, vec!["firstname", "email"]);

        // Nothing valid leaves only the id
        let q = ContactQuery::from_params(&params(&[("fields", "password,id")]));
        assert!(q.fields.is_empty());
        assert_eq!(q.select_sql().0, "SELECT id FROM contacts ORDER BY id LIMIT ? OFFSET ?");
    }

    #[test]
    fn test_includes_whitelist() {
        let q = ContactQuery::from_params(&params(&[(
            "includes",
            "reminders,bogus,notes,notes",
        )]));
        assert_eq!(q.includes, vec![Include::Notes, Include::Reminders]);
        assert!(q.includes(Include::Notes));
        assert!(!q.includes(Include::Activities));
    }

    #[test]
    fn test_search_and_circle_are_bound() {
        let q = ContactQuery::from_params(&params(&[
            ("fields", "firstname"),
            ("search", "an'; DROP TABLE contacts;--"),
            ("circle", "work"),
            ("page", "2"),
            ("limit", "5"),
        ]));
        let (sql, values) = q.select_sql();
        assert!(!sql.contains("DROP"));
        assert!(sql.starts_with("SELECT id, firstname FROM contacts WHERE ("));
        assert!(sql.contains("json_each(contacts.circles)"));
        assert_eq!(values.len(), 6);
        assert_eq!(
            values[0],
            Value::String("%an'; DROP TABLE contacts;--%".to_string())
        );
        assert_eq!(values[3], Value::String("work".to_string()));
        assert_eq!(values[4], Value::Integer(5));
        assert_eq!(values[5], Value::Integer(5));

        let (count_sql, count_values) = q.count_sql();
        assert!(count_sql.starts_with("SELECT COUNT(*) FROM contacts WHERE"));
        assert_eq!(count_values.len(), 4);
    }

    #[test]
    fn test_like_wildcards_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_blank_filters_ignored() {
        let q = ContactQuery::from_params(&params(&[("search", "  "), ("circle", "")]));
        assert!(q.search.is_none());
        assert!(q.circle.is_none());
        assert_eq!(q.count_sql().0, "SELECT COUNT(*) FROM contacts");
    }
}
