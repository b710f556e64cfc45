//! Identity realms and their login pages.
use std::fmt;

/// One of the two independent identity domains a request can be authorized by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Realm {
    EndUser,
    Backoffice,
}

impl Realm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Realm::EndUser => "enduser",
            Realm::Backoffice => "backoffice",
        }
    }

    pub fn login_target(&self) -> LoginTarget {
        match self {
            Realm::EndUser => LoginTarget::EndUser,
            Realm::Backoffice => LoginTarget::Backoffice,
        }
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login page a user is sent to when a realm cannot recover its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginTarget {
    EndUser,
    Backoffice,
}

impl fmt::Display for LoginTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginTarget::EndUser => f.write_str("enduser-login"),
            LoginTarget::Backoffice => f.write_str("backoffice-login"),
        }
    }
}
