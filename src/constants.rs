//! Constants

// for web sessions
pub(crate) const SESSION_COOKIE_NAME: &str = "lwsessid";
pub(crate) const SESSION_KEY_PREFIX: &str = "session:";
pub(crate) const SESSION_DURATION_SECS: u64 = 1209600;

// flash messages
pub(crate) const FLASH_INVALID_WEEK: &str = "invalid ISO week date";
pub(crate) const FLASH_LOGIN_REQUIRED: &str = "Please log in to access this page.";
pub(crate) const FLASH_LOGGED_OUT: &str = "You have been logged out";
pub(crate) const FLASH_BAD_CREDENTIALS: &str = "Invalid username or password";
pub(crate) const FLASH_REGISTERED: &str = "A confirmation link has been sent to you via email";
pub(crate) const FLASH_CONFIRMATION_RESENT: &str =
    "A new confirmation link has been sent via email";
pub(crate) const FLASH_CONFIRMED: &str = "You have confirmed your account. Thanks!";
pub(crate) const FLASH_BAD_CONFIRMATION: &str = "The confirmation link is invalid or has expired.";
pub(crate) const FLASH_RESET_SENT: &str =
    "If a matching account was found, a reset email has been sent.";
pub(crate) const FLASH_PASSWORD_UPDATED: &str = "Your password has been updated";
pub(crate) const FLASH_RESET_FAILED: &str = "Password reset failed. Please try again";
pub(crate) const FLASH_WRONG_PASSWORD: &str = "Incorrect current password";
