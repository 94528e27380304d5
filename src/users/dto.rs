use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo::{ProfileRow, User};
use crate::{
    auth::password::is_strong_enough,
    error::{ApiError, FieldErrors},
    recipes::dto::RecipeShort,
};

const EMAIL_MAX_LEN: usize = 254;
const USER_MAX_LEN: usize = 150;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl RegisterRequest {
    /// Trims fields and lowercases the email, then checks every field.
    pub fn normalize_and_validate(mut self) -> Result<Self, ApiError> {
        self.email = self.email.trim().to_lowercase();
        self.username = self.username.trim().to_string();
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();

        let mut errors = FieldErrors::new();
        if self.email.len() > EMAIL_MAX_LEN || !is_valid_email(&self.email) {
            errors.add("email", "Enter a valid email address.");
        }
        if self.username.is_empty()
            || self.username.chars().count() > USER_MAX_LEN
            || !USERNAME_RE.is_match(&self.username)
        {
            errors.add(
                "username",
                "Use up to 150 letters, digits and the characters @ . + - _",
            );
        }
        for (field, value) in [("first_name", &self.first_name), ("last_name", &self.last_name)] {
            if value.is_empty() {
                errors.add(field, "This field may not be blank.");
            } else if value.chars().count() > USER_MAX_LEN {
                errors.add(field, "Ensure this field has no more than 150 characters.");
            }
        }
        if !is_strong_enough(&self.password) {
            errors.add("password", "Password too short.");
        }
        errors.into_result()?;
        Ok(self)
    }
}

#[derive(Debug, Serialize)]
pub struct UserCreated {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for UserCreated {
    fn from(u: User) -> Self {
        Self {
            email: u.email,
            id: u.id,
            username: u.username,
            first_name: u.first_name,
            last_name: u.last_name,
        }
    }
}

/// Read model of a user relative to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl From<ProfileRow> for Profile {
    fn from(r: ProfileRow) -> Self {
        Self {
            email: r.email,
            id: r.id,
            username: r.username,
            first_name: r.first_name,
            last_name: r.last_name,
            is_subscribed: r.is_subscribed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub new_password: String,
    pub current_password: String,
}

/// A followed author with a preview of their recipes.
#[derive(Debug, Serialize)]
pub struct SubscriptionRead {
    #[serde(flatten)]
    pub author: Profile,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipesLimitQuery {
    pub recipes_limit: Option<String>,
}

impl RecipesLimitQuery {
    pub fn parse(&self) -> Result<Option<i64>, ApiError> {
        match self.recipes_limit.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|n| *n >= 0)
                .map(Some)
                .ok_or_else(|| ApiError::field("recipes_limit", "recipes_limit must be a number")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            email: "  Cook@Example.COM ".into(),
            username: "chef.anna".into(),
            first_name: "Anna".into(),
            last_name: "Cook".into(),
            password: "long-enough".into(),
        }
    }

    #[test]
    fn valid_registration_is_normalized() {
        let r = request().normalize_and_validate().unwrap();
        assert_eq!(r.email, "cook@example.com");
    }

    #[test]
    fn rejects_bad_email_username_and_password() {
        let mut r = request();
        r.email = "not-an-email".into();
        r.username = "bad name!".into();
        r.password = "short".into();
        r.last_name = "   ".into();
        let Err(ApiError::Validation(errors)) = r.normalize_and_validate() else {
            panic!("expected validation error");
        };
        assert!(errors.contains("email"));
        assert!(errors.contains("username"));
        assert!(errors.contains("password"));
        assert!(errors.contains("last_name"));
        assert!(!errors.contains("first_name"));
    }

    #[test]
    fn email_regex() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
    }

    #[test]
    fn recipes_limit_parsing() {
        let q = |v: Option<&str>| RecipesLimitQuery {
            recipes_limit: v.map(String::from),
        };
        assert_eq!(q(None).parse().unwrap(), None);
        assert_eq!(q(Some("3")).parse().unwrap(), Some(3));
        assert!(q(Some("three")).parse().is_err());
        assert!(q(Some("-1")).parse().is_err());
    }

    #[test]
    fn subscription_read_flattens_author() {
        let read = SubscriptionRead {
            author: Profile {
                email: "a@b.co".into(),
                id: Uuid::nil(),
                username: "a".into(),
                first_name: "A".into(),
                last_name: "B".into(),
                is_subscribed: true,
            },
            recipes: vec![],
            recipes_count: 0,
        };
        let json = serde_json::to_value(&read).unwrap();
        assert_eq!(json["username"], "a");
        assert_eq!(json["is_subscribed"], true);
        assert_eq!(json["recipes_count"], 0);
    }
}
