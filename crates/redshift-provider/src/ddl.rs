//! DDL statement text for database lifecycle operations.
//!
//! Databases and users are addressed by name, so every builder takes the name
//! the engine currently knows the object by.

use redshift_core::ConnectionLimit;

/// Quotes an identifier, doubling embedded quotes.
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// `CREATE DATABASE` with optional clauses in a fixed order: OWNER, then CONNECTION LIMIT.
pub fn create_database(
    name: &str,
    owner: Option<&str>,
    connection_limit: Option<&ConnectionLimit>,
) -> String {
    let mut statement = format!("CREATE DATABASE {}", quote_identifier(name));
    if let Some(owner) = owner {
        statement.push_str(" OWNER ");
        statement.push_str(&quote_identifier(owner));
    }
    if let Some(limit) = connection_limit {
        statement.push_str(" CONNECTION LIMIT ");
        statement.push_str(limit.as_str());
    }
    statement
}

pub fn rename_database(old_name: &str, new_name: &str) -> String {
    format!(
        "ALTER DATABASE {} RENAME TO {}",
        quote_identifier(old_name),
        quote_identifier(new_name)
    )
}

pub fn alter_owner(name: &str, owner: &str) -> String {
    format!(
        "ALTER DATABASE {} OWNER TO {}",
        quote_identifier(name),
        quote_identifier(owner)
    )
}

pub fn alter_connection_limit(name: &str, limit: &ConnectionLimit) -> String {
    format!(
        "ALTER DATABASE {} CONNECTION LIMIT {}",
        quote_identifier(name),
        limit
    )
}

pub fn drop_database(name: &str) -> String {
    format!("DROP DATABASE {}", quote_identifier(name))
}
