use futures::Future;

use crate::domain::CandidateMail;

// Mods

pub mod default;

// Types

pub type Result<T = ()> = std::result::Result<T, Error>;

// Errors

#[derive(Debug, thiserror::Error)]
#[error("mail error: {0}")]
pub struct Error(#[source] pub Box<dyn std::error::Error + Send + Sync>);

// Traits

#[cfg_attr(test, mockall::automock)]
pub trait MailSender: Send + Sync {
    fn send_candidate_mail(&self, mail: &CandidateMail) -> impl Future<Output = Result> + Send;
}
