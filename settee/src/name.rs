use settee_types::{Error, Result};
use std::sync::LazyLock;

// http://docs.couchdb.org/en/2.0.0/api/database/common.html#head--db
static VALID_DB_NAME: LazyLock<regex_lite::Regex> =
    LazyLock::new(|| regex_lite::Regex::new(r"^[a-z][a-z0-9_$()+/-]*$").expect("static regex"));

/// Checks a database name against the wire protocol's naming rule.
pub fn validate_db_name(name: &str) -> Result<()> {
    if VALID_DB_NAME.is_match(name) {
        Ok(())
    } else {
        Err(Error::bad_request(format!("invalid database name: {name:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_protocol_names() {
        for name in ["a", "animals", "db_1", "a$b(c)+d/e-f"] {
            assert!(validate_db_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_everything_else() {
        for name in ["", "1db", "_users", "Animals", "db name", "db.x", "dé"] {
            assert!(validate_db_name(name).is_err(), "{name}");
        }
    }
}
