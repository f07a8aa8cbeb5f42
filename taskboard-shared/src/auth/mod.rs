/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: access/refresh token issuing and validation
/// - [`middleware`]: resolving the acting user of an HTTP request
/// - [`authorization`]: the ownership guard every board mutation goes through
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::password::{hash_password, verify_password};
/// use taskboard_shared::auth::jwt::{issue_token_pair, validate_access_token};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("kanban-2024")?;
/// assert!(verify_password("kanban-2024", &hash)?);
///
/// let secret = "board-secret-key-at-least-32-bytes!!";
/// let pair = issue_token_pair(Uuid::new_v4(), secret)?;
/// validate_access_token(&pair.access_token, secret)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
