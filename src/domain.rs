use chrono::{DateTime, Utc};
use enum_display::EnumDisplay;
use serde::{Deserialize, Serialize};
use serde_trim::option_string_trim;
use uuid::Uuid;

// Types

pub type Result<T = ()> = std::result::Result<T, Error>;

// Errors

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Base URL missing")]
    MissingBaseUrl,
    #[error("Candidate id missing")]
    MissingCandidateId,
    #[error("Candidate email missing")]
    MissingEmail,
}

// Consts

const DEFAULT_FIRST_NAME: &str = "there";

// Data structs

/// A candidate tracked by the recruitment pipeline.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Email.
    #[serde(default, deserialize_with = "option_string_trim")]
    pub email: Option<String>,
    /// Document id.
    #[serde(default, deserialize_with = "option_string_trim")]
    pub id: Option<String>,
    /// Full name.
    #[serde(default, deserialize_with = "option_string_trim")]
    pub name: Option<String>,
}

impl Candidate {
    /// First word of the candidate name, or a neutral greeting when the name
    /// is unknown.
    pub fn first_name(&self) -> &str {
        self.name
            .as_deref()
            .and_then(|name| name.split_whitespace().next())
            .unwrap_or(DEFAULT_FIRST_NAME)
    }
}

/// A validated mail ready to be rendered and sent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CandidateMail {
    /// Greeting name.
    pub first_name: String,
    /// Kind of mail.
    pub kind: MailKind,
    /// Deep link embedded in the mail, when the kind carries one.
    pub link: Option<String>,
    /// Recipient email.
    pub to: String,
}

/// Kind of transactional mail sent to a candidate.
#[derive(Clone, Copy, Debug, Deserialize, EnumDisplay, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MailKind {
    Congratulations,
    VerifyDetails,
}

impl MailKind {
    pub fn subject(self) -> &'static str {
        match self {
            Self::Congratulations => "Congratulations!",
            Self::VerifyDetails => "Please verify your details",
        }
    }
}

/// Request to send a transactional mail to a candidate.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailRequest {
    /// Base URL of the web application, used to build deep links.
    #[serde(default, deserialize_with = "option_string_trim")]
    pub base_url: Option<String>,
    /// Candidate the mail is about.
    #[serde(default)]
    pub candidate: Candidate,
    /// Kind of mail to send.
    pub kind: MailKind,
}

/// Outcome of a mail dispatch.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailResult {
    /// Failure reason, absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the mail was sent.
    pub success: bool,
}

/// A notification displayed to a recruiter.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Document id.
    pub id: String,
    /// Body text.
    pub message: String,
    /// Optional headline.
    pub title: Option<String>,
    /// Id of the user it belongs to.
    pub user_id: String,
    /// Whether its owner has seen it.
    pub viewed: bool,
}

impl Notification {
    pub fn new(user_id: String, title: Option<String>, message: String) -> Self {
        Self {
            created_at: Utc::now(),
            id: Uuid::new_v4().to_string(),
            message,
            title,
            user_id,
            viewed: false,
        }
    }
}

// CandidateMail

impl TryFrom<MailRequest> for CandidateMail {
    type Error = Error;

    fn try_from(req: MailRequest) -> Result<Self> {
        let to = req.candidate.email.clone().ok_or(Error::MissingEmail)?;
        let link = match req.kind {
            MailKind::Congratulations => None,
            MailKind::VerifyDetails => {
                let base_url = req.base_url.ok_or(Error::MissingBaseUrl)?;
                let id = req.candidate.id.as_deref().ok_or(Error::MissingCandidateId)?;
                Some(format!("{base_url}/verify-details?candidateId={id}"))
            }
        };
        Ok(Self {
            first_name: req.candidate.first_name().into(),
            kind: req.kind,
            link,
            to,
        })
    }
}

// Tests

#[cfg(test)]
mod test {
    use super::*;

    // Mods

    mod candidate {
        use super::*;

        // Mods

        mod first_name {
            use super::*;

            // Tests

            #[test]
            fn first_word() {
                let candidate = Candidate {
                    name: Some("Jane Mary Doe".into()),
                    ..Default::default()
                };
                assert_eq!(candidate.first_name(), "Jane");
            }

            #[test]
            fn no_name() {
                let candidate = Candidate::default();
                assert_eq!(candidate.first_name(), "there");
            }

            #[test]
            fn single_word() {
                let candidate = Candidate {
                    name: Some("Jane".into()),
                    ..Default::default()
                };
                assert_eq!(candidate.first_name(), "Jane");
            }
        }
    }

    mod candidate_mail {
        use super::*;

        // Mods

        mod try_from {
            use super::*;

            // Data

            struct Data {
                req: MailRequest,
            }

            impl Default for Data {
                fn default() -> Self {
                    Self {
                        req: MailRequest {
                            base_url: Some("https://hiredesk.example.com".into()),
                            candidate: Candidate {
                                email: Some("jane.doe@example.com".into()),
                                id: Some("cand-42".into()),
                                name: Some("Jane Doe".into()),
                            },
                            kind: MailKind::VerifyDetails,
                        },
                    }
                }
            }

            // Tests

            #[test]
            fn congratulations() {
                let mut data = Data::default();
                data.req.kind = MailKind::Congratulations;
                let mail = CandidateMail::try_from(data.req).unwrap();
                assert_eq!(
                    mail,
                    CandidateMail {
                        first_name: "Jane".into(),
                        kind: MailKind::Congratulations,
                        link: None,
                        to: "jane.doe@example.com".into(),
                    }
                );
            }

            #[test]
            fn congratulations_without_base_url() {
                let mut data = Data::default();
                data.req.base_url = None;
                data.req.kind = MailKind::Congratulations;
                let mail = CandidateMail::try_from(data.req).unwrap();
                assert_eq!(mail.link, None);
            }

            #[test]
            fn missing_base_url() {
                let mut data = Data::default();
                data.req.base_url = None;
                let err = CandidateMail::try_from(data.req).unwrap_err();
                assert!(matches!(err, Error::MissingBaseUrl));
                assert_eq!(err.to_string(), "Base URL missing");
            }

            #[test]
            fn missing_candidate_id() {
                let mut data = Data::default();
                data.req.candidate.id = None;
                let err = CandidateMail::try_from(data.req).unwrap_err();
                assert!(matches!(err, Error::MissingCandidateId));
                assert_eq!(err.to_string(), "Candidate id missing");
            }

            #[test]
            fn missing_email() {
                let mut data = Data::default();
                data.req.candidate.email = None;
                let err = CandidateMail::try_from(data.req).unwrap_err();
                assert!(matches!(err, Error::MissingEmail));
                assert_eq!(err.to_string(), "Candidate email missing");
            }

            #[test]
            fn missing_email_congratulations() {
                let mut data = Data::default();
                data.req.candidate.email = None;
                data.req.kind = MailKind::Congratulations;
                let err = CandidateMail::try_from(data.req).unwrap_err();
                assert!(matches!(err, Error::MissingEmail));
            }

            #[test]
            fn verify_details() {
                let data = Data::default();
                let mail = CandidateMail::try_from(data.req).unwrap();
                assert_eq!(
                    mail.link,
                    Some("https://hiredesk.example.com/verify-details?candidateId=cand-42".into())
                );
            }
        }
    }

    mod mail_request {
        use super::*;

        // Mods

        mod deserialize {
            use super::*;

            // Tests

            #[test]
            fn blank_fields_are_none() {
                let json = serde_json::json!({
                    "kind": "verify-details",
                    "candidate": {
                        "email": "  ",
                        "id": "",
                        "name": "   "
                    },
                    "baseUrl": " "
                });
                let req: MailRequest = serde_json::from_value(json).unwrap();
                assert_eq!(
                    req,
                    MailRequest {
                        base_url: None,
                        candidate: Candidate::default(),
                        kind: MailKind::VerifyDetails,
                    }
                );
            }

            #[test]
            fn kebab_case_kinds() {
                let json = serde_json::json!({
                    "kind": "congratulations",
                    "candidate": {"email": "jane.doe@example.com"}
                });
                let req: MailRequest = serde_json::from_value(json).unwrap();
                assert_eq!(req.kind, MailKind::Congratulations);
                let json = serde_json::json!({
                    "kind": "verify-details",
                    "candidate": {"email": "jane.doe@example.com"}
                });
                let req: MailRequest = serde_json::from_value(json).unwrap();
                assert_eq!(req.kind, MailKind::VerifyDetails);
            }

            #[test]
            fn missing_candidate() {
                let json = serde_json::json!({"kind": "congratulations"});
                let req: MailRequest = serde_json::from_value(json).unwrap();
                assert_eq!(req.candidate, Candidate::default());
            }

            #[test]
            fn trimmed_fields() {
                let json = serde_json::json!({
                    "kind": "congratulations",
                    "candidate": {
                        "email": " jane.doe@example.com ",
                        "name": " Jane Doe "
                    }
                });
                let req: MailRequest = serde_json::from_value(json).unwrap();
                assert_eq!(req.candidate.email.as_deref(), Some("jane.doe@example.com"));
                assert_eq!(req.candidate.name.as_deref(), Some("Jane Doe"));
            }
        }
    }

    mod mail_result {
        use super::*;

        // Mods

        mod serialize {
            use super::*;

            // Tests

            #[test]
            fn error_omitted_on_success() {
                let res = MailResult {
                    error: None,
                    success: true,
                };
                let json = serde_json::to_value(&res).unwrap();
                assert_eq!(json, serde_json::json!({"success": true}));
            }

            #[test]
            fn failure() {
                let res = MailResult {
                    error: Some("Candidate email missing".into()),
                    success: false,
                };
                let json = serde_json::to_value(&res).unwrap();
                assert_eq!(
                    json,
                    serde_json::json!({"success": false, "error": "Candidate email missing"})
                );
            }
        }
    }

    mod notification {
        use super::*;

        // Mods

        mod new {
            use super::*;

            // Tests

            #[test]
            fn unviewed() {
                let notif = Notification::new(
                    "recruiter-1".into(),
                    Some("New application".into()),
                    "Jane Doe applied".into(),
                );
                assert!(!notif.viewed);
                assert!(!notif.id.is_empty());
                assert_eq!(notif.user_id, "recruiter-1");
            }
        }

        mod serialize {
            use super::*;

            // Tests

            #[test]
            fn camel_case() {
                let notif = Notification {
                    created_at: "2024-05-01T10:00:00Z".parse().unwrap(),
                    id: "notif-1".into(),
                    message: "Jane Doe applied".into(),
                    title: None,
                    user_id: "recruiter-1".into(),
                    viewed: false,
                };
                let json = serde_json::to_value(&notif).unwrap();
                assert_eq!(
                    json,
                    serde_json::json!({
                        "createdAt": "2024-05-01T10:00:00Z",
                        "id": "notif-1",
                        "message": "Jane Doe applied",
                        "title": null,
                        "userId": "recruiter-1",
                        "viewed": false
                    })
                );
            }
        }
    }
}
