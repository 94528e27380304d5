//! Favorite, shopping-cart and subscription relations.
//!
//! Each is a set of `(user, target)` pairs guarded by a unique index. The
//! index, not application code, decides which of two concurrent inserts wins.

pub mod services;
pub mod store;

pub use services::{add, remove};
pub use store::MembershipStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MembershipKind {
    Favorite,
    ShoppingCart,
    Subscription,
}

impl MembershipKind {
    pub(crate) fn table(self) -> &'static str {
        match self {
            MembershipKind::Favorite => "favorites",
            MembershipKind::ShoppingCart => "shopping_cart",
            MembershipKind::Subscription => "subscriptions",
        }
    }

    pub(crate) fn target_column(self) -> &'static str {
        match self {
            MembershipKind::Favorite | MembershipKind::ShoppingCart => "recipe_id",
            MembershipKind::Subscription => "author_id",
        }
    }

    pub fn duplicate_message(self) -> &'static str {
        match self {
            MembershipKind::Favorite => "Recipe is already in favorites",
            MembershipKind::ShoppingCart => "Recipe is already in the shopping cart",
            MembershipKind::Subscription => "Already subscribed to this author",
        }
    }

    pub fn missing_message(self) -> &'static str {
        match self {
            MembershipKind::Favorite => "Recipe is not in favorites",
            MembershipKind::ShoppingCart => "Recipe is not in the shopping cart",
            MembershipKind::Subscription => "Not subscribed to this author",
        }
    }
}
