/*
 * Responsibility
 * - The two request pipeline stages
 *   - authorize: pre-flight token attachment
 *   - recovery: post-flight 401 handling
 */
pub mod authorize;
pub mod recovery;

pub use authorize::RequestAuthorizer;
pub use recovery::{Recovery, ResponseRecovery};
