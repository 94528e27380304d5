use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::images::{decode_data_uri, DecodedImage};
use crate::{
    error::{ApiError, FieldErrors},
    pagination::PageParams,
    tags::repo::Tag,
    users::dto::Profile,
};

pub const NAME_MAX_LEN: usize = 200;

// ---- write model ----

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i64,
}

/// Body of `POST /recipes` and `PATCH /recipes/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeWrite {
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<Uuid>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInput {
    pub ingredient_id: Uuid,
    pub amount: i32,
}

/// A validated update: absent scalar fields keep their stored values, the
/// ingredient and tag sets are always replaced.
#[derive(Debug, Clone)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<DecodedImage>,
    pub ingredients: Vec<LineInput>,
    pub tags: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: DecodedImage,
    pub ingredients: Vec<LineInput>,
    pub tags: Vec<Uuid>,
}

const REQUIRED: &str = "This field is required.";

impl RecipeWrite {
    pub fn validate_create(self) -> Result<NewRecipe, ApiError> {
        let changes = self.check(true)?;
        match (changes.name, changes.text, changes.cooking_time, changes.image) {
            (Some(name), Some(text), Some(cooking_time), Some(image)) => Ok(NewRecipe {
                name,
                text,
                cooking_time,
                image,
                ingredients: changes.ingredients,
                tags: changes.tags,
            }),
            _ => Err(ApiError::BadRequest("Incomplete recipe".into())),
        }
    }

    pub fn validate_update(self) -> Result<RecipeChanges, ApiError> {
        self.check(false)
    }

    fn check(self, require_all: bool) -> Result<RecipeChanges, ApiError> {
        let mut errors = FieldErrors::new();

        let ingredients = match self.ingredients {
            None => {
                errors.add("ingredients", REQUIRED);
                Vec::new()
            }
            Some(items) if items.is_empty() => {
                errors.add("ingredients", "Ingredient list must not be empty.");
                Vec::new()
            }
            Some(items) => {
                let mut seen = HashSet::with_capacity(items.len());
                let mut lines = Vec::with_capacity(items.len());
                for item in items {
                    if !seen.insert(item.id) {
                        errors.add(
                            "ingredients",
                            format!("Ingredient {} is listed more than once.", item.id),
                        );
                        continue;
                    }
                    match i32::try_from(item.amount) {
                        Ok(amount) if amount >= 1 => lines.push(LineInput {
                            ingredient_id: item.id,
                            amount,
                        }),
                        _ => errors.add("ingredients", "Amount must be at least 1."),
                    }
                }
                lines
            }
        };

        let tags = match self.tags {
            None => {
                errors.add("tags", REQUIRED);
                Vec::new()
            }
            Some(ids) if ids.is_empty() => {
                errors.add("tags", "Tag list must not be empty.");
                Vec::new()
            }
            Some(ids) => {
                let mut seen = HashSet::with_capacity(ids.len());
                let mut unique = Vec::with_capacity(ids.len());
                for id in ids {
                    if seen.insert(id) {
                        unique.push(id);
                    } else {
                        errors.add("tags", format!("Tag {} is listed more than once.", id));
                    }
                }
                unique
            }
        };

        let name = match self.name.map(|n| n.trim().to_string()) {
            None => {
                if require_all {
                    errors.add("name", REQUIRED);
                }
                None
            }
            Some(n) if n.is_empty() => {
                errors.add("name", "This field may not be blank.");
                None
            }
            Some(n) if n.chars().count() > NAME_MAX_LEN => {
                errors.add("name", "Ensure this field has no more than 200 characters.");
                None
            }
            Some(n) => Some(n),
        };

        let text = match self.text {
            None => {
                if require_all {
                    errors.add("text", REQUIRED);
                }
                None
            }
            Some(t) if t.trim().is_empty() => {
                errors.add("text", "This field may not be blank.");
                None
            }
            Some(t) => Some(t),
        };

        let cooking_time = match self.cooking_time {
            None => {
                if require_all {
                    errors.add("cooking_time", REQUIRED);
                }
                None
            }
            Some(t) => match i32::try_from(t) {
                Ok(t) if t >= 1 => Some(t),
                _ => {
                    errors.add("cooking_time", "Cooking time must be at least 1 minute.");
                    None
                }
            },
        };

        let image = match self.image {
            None => {
                if require_all {
                    errors.add("image", REQUIRED);
                }
                None
            }
            Some(raw) => match decode_data_uri(&raw) {
                Ok(img) => Some(img),
                Err(msg) => {
                    errors.add("image", msg);
                    None
                }
            },
        };

        errors.into_result()?;
        Ok(RecipeChanges {
            name,
            text,
            cooking_time,
            image,
            ingredients,
            tags,
        })
    }
}

// ---- read model ----

#[derive(Debug, Clone, Serialize)]
pub struct IngredientLineRead {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeRead {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: Profile,
    pub ingredients: Vec<IngredientLineRead>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
}

/// Compact form used in favorites, cart and subscription responses.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeShort {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

// ---- list filters ----

#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: Option<Uuid>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Vec<String>,
    pub author: Option<Uuid>,
    pub favorited_by: Option<Uuid>,
    pub in_cart_of: Option<Uuid>,
}

fn is_set(flag: &Option<String>) -> bool {
    matches!(
        flag.as_deref().map(str::trim),
        Some("1") | Some("true") | Some("True")
    )
}

impl RecipeListQuery {
    /// Favorite and cart flags only narrow the list for a known viewer.
    pub fn filter(&self, viewer: Option<Uuid>) -> RecipeFilter {
        RecipeFilter {
            tags: self
                .tags
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            author: self.author,
            favorited_by: viewer.filter(|_| is_set(&self.is_favorited)),
            in_cart_of: viewer.filter(|_| is_set(&self.is_in_shopping_cart)),
        }
    }

    pub fn page(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn valid() -> RecipeWrite {
        RecipeWrite {
            ingredients: Some(vec![
                IngredientAmount { id: Uuid::from_u128(1), amount: 100 },
                IngredientAmount { id: Uuid::from_u128(2), amount: 2 },
            ]),
            tags: Some(vec![Uuid::from_u128(10)]),
            image: Some(PNG.into()),
            name: Some("  Pancakes ".into()),
            text: Some("Mix and fry.".into()),
            cooking_time: Some(15),
        }
    }

    fn fields(err: ApiError) -> FieldErrors {
        match err {
            ApiError::Validation(f) => f,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_create_passes() {
        let recipe = valid().validate_create().unwrap();
        assert_eq!(recipe.name, "Pancakes");
        assert_eq!(recipe.cooking_time, 15);
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.tags, vec![Uuid::from_u128(10)]);
    }

    #[test]
    fn duplicate_ingredient_is_rejected() {
        let mut w = valid();
        w.ingredients = Some(vec![
            IngredientAmount { id: Uuid::from_u128(1), amount: 1 },
            IngredientAmount { id: Uuid::from_u128(1), amount: 5 },
        ]);
        let f = fields(w.validate_create().unwrap_err());
        assert_eq!(f.get("ingredients").map(|m| m.len()), Some(1));
    }

    #[test]
    fn empty_or_missing_sets_are_rejected() {
        let mut w = valid();
        w.ingredients = Some(vec![]);
        w.tags = None;
        let f = fields(w.validate_create().unwrap_err());
        assert!(f.contains("ingredients"));
        assert!(f.contains("tags"));
    }

    #[test]
    fn duplicate_tag_is_rejected() {
        let mut w = valid();
        w.tags = Some(vec![Uuid::from_u128(10), Uuid::from_u128(10)]);
        let f = fields(w.validate_update().unwrap_err());
        assert!(f.contains("tags"));
    }

    #[test]
    fn amount_and_cooking_time_must_be_positive() {
        let mut w = valid();
        w.ingredients = Some(vec![IngredientAmount { id: Uuid::from_u128(1), amount: 0 }]);
        w.cooking_time = Some(0);
        let f = fields(w.validate_create().unwrap_err());
        assert!(f.contains("ingredients"));
        assert!(f.contains("cooking_time"));
    }

    #[test]
    fn create_requires_scalar_fields() {
        let w = RecipeWrite {
            ingredients: valid().ingredients,
            tags: valid().tags,
            ..Default::default()
        };
        let f = fields(w.validate_create().unwrap_err());
        for field in ["name", "text", "cooking_time", "image"] {
            assert!(f.contains(field), "{field} should be required");
        }
    }

    #[test]
    fn update_keeps_scalars_optional_but_needs_sets() {
        let w = RecipeWrite {
            ingredients: valid().ingredients,
            tags: valid().tags,
            ..Default::default()
        };
        let changes = w.validate_update().unwrap();
        assert!(changes.name.is_none());
        assert!(changes.image.is_none());
        assert_eq!(changes.ingredients.len(), 2);

        let f = fields(RecipeWrite::default().validate_update().unwrap_err());
        assert!(f.contains("ingredients"));
        assert!(f.contains("tags"));
        assert!(!f.contains("name"));
    }

    #[test]
    fn bad_image_and_long_name() {
        let mut w = valid();
        w.image = Some("not a data uri".into());
        w.name = Some("x".repeat(NAME_MAX_LEN + 1));
        let f = fields(w.validate_create().unwrap_err());
        assert!(f.contains("image"));
        assert!(f.contains("name"));
    }

    #[test]
    fn filter_flags_are_ignored_for_anonymous() {
        let q = RecipeListQuery {
            tags: vec!["breakfast".into(), " ".into()],
            is_favorited: Some("1".into()),
            is_in_shopping_cart: Some("true".into()),
            ..Default::default()
        };
        let anon = q.filter(None);
        assert_eq!(anon.tags, vec!["breakfast".to_string()]);
        assert!(anon.favorited_by.is_none());
        assert!(anon.in_cart_of.is_none());

        let me = Uuid::new_v4();
        let mine = q.filter(Some(me));
        assert_eq!(mine.favorited_by, Some(me));
        assert_eq!(mine.in_cart_of, Some(me));
    }

    #[test]
    fn false_flags_do_not_filter() {
        let q = RecipeListQuery {
            is_favorited: Some("0".into()),
            ..Default::default()
        };
        assert!(q.filter(Some(Uuid::new_v4())).favorited_by.is_none());
    }
}
