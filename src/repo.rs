mod pro_users;

pub use pro_users::{ProUsersRepo, SubscriptionRecord};
