use std::time::Duration;

use liquid::{object, Object, Parser, Template};
use mail_send::{mail_builder::MessageBuilder, SmtpClientBuilder};
use tokio::time::{sleep, timeout};
use tracing::{debug, instrument, warn};

use crate::domain::{CandidateMail, MailKind};

use super::{MailSender, Result};

// Consts

const RETRY_DELAY: Duration = Duration::from_millis(500);

// Errors

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("liquid error: {0}")]
    Liquid(
        #[from]
        #[source]
        liquid::Error,
    ),
    #[error("{0}")]
    Mail(
        #[from]
        #[source]
        mail_send::Error,
    ),
    #[error("smtp timeout after {0:?}")]
    Timeout(Duration),
}

// Args

#[derive(clap::Args, Clone, Debug, Eq, PartialEq)]
pub struct DefaultMailSenderArgs {
    #[arg(
        long = "smtp-attempts",
        env = "SMTP_ATTEMPTS",
        name = "SMTP_ATTEMPTS",
        default_value_t = 1,
        long_help = "Maximum number of delivery attempts for one mail"
    )]
    pub attempts: u32,
    #[arg(
        long = "smtp-from",
        env = "SMTP_FROM",
        name = "SMTP_FROM",
        long_help = "Email address used to send mail"
    )]
    pub from: String,
    #[arg(
        long = "smtp-host",
        env = "SMTP_HOST",
        name = "SMTP_HOST",
        long_help = "SMTP server address"
    )]
    pub host: String,
    #[arg(
        long = "smtp-implicit-tls",
        env = "SMTP_IMPLICIT_TLS",
        name = "SMTP_IMPLICIT_TLS",
        default_value_t = false,
        long_help = "Enable SMTP implicit TLS"
    )]
    pub implicit_tls: bool,
    #[arg(
        long = "smtp-password",
        env = "SMTP_PASSWORD",
        name = "SMTP_PASSWORD",
        long_help = "SMTP password"
    )]
    pub password: Option<String>,
    #[arg(
        long = "smtp-port",
        env = "SMTP_PORT",
        name = "SMTP_PORT",
        default_value_t = 25,
        long_help = "SMTP server port"
    )]
    pub port: u16,
    #[arg(
        long = "smtp-timeout",
        env = "SMTP_TIMEOUT",
        name = "SMTP_TIMEOUT",
        default_value_t = 30,
        long_help = "Number of seconds before one delivery attempt times out"
    )]
    pub timeout: u64,
    #[arg(
        long = "smtp-tls",
        env = "SMTP_TLS",
        name = "SMTP_TLS",
        default_value_t = false,
        long_help = "Enable SMTP TLS"
    )]
    pub tls: bool,
    #[arg(
        long = "smtp-user",
        env = "SMTP_USER",
        name = "SMTP_USER",
        long_help = "SMTP user, the from address is used when only a password is set"
    )]
    pub user: Option<String>,
}

// Data structs

struct RenderedMail {
    html: String,
    subject: &'static str,
    text: String,
}

// DefaultMailSender

pub struct DefaultMailSender {
    args: DefaultMailSenderArgs,
    congrats_html_tpl: Template,
    congrats_text_tpl: Template,
    verify_html_tpl: Template,
    verify_text_tpl: Template,
}

impl DefaultMailSender {
    pub fn new(args: DefaultMailSenderArgs) -> anyhow::Result<Self> {
        let parser = Parser::new();
        debug!("parsing congratulations templates");
        let congrats_html_tpl = parser.parse(include_str!(
            "../../resources/main/mail/congratulations.html.liquid"
        ))?;
        let congrats_text_tpl = parser.parse(include_str!(
            "../../resources/main/mail/congratulations.txt.liquid"
        ))?;
        debug!("parsing verify details templates");
        let verify_html_tpl = parser.parse(include_str!(
            "../../resources/main/mail/verify_details.html.liquid"
        ))?;
        let verify_text_tpl = parser.parse(include_str!(
            "../../resources/main/mail/verify_details.txt.liquid"
        ))?;
        Ok(Self {
            args,
            congrats_html_tpl,
            congrats_text_tpl,
            verify_html_tpl,
            verify_text_tpl,
        })
    }

    fn render(&self, mail: &CandidateMail) -> Result<RenderedMail> {
        let (html_tpl, text_tpl) = match mail.kind {
            MailKind::Congratulations => (&self.congrats_html_tpl, &self.congrats_text_tpl),
            MailKind::VerifyDetails => (&self.verify_html_tpl, &self.verify_text_tpl),
        };
        let vars = template_vars(mail);
        let html = html_tpl.render(&vars)?;
        let text = text_tpl.render(&vars)?;
        Ok(RenderedMail {
            html,
            subject: mail.kind.subject(),
            text,
        })
    }

    async fn send(&self, msg: MessageBuilder<'_>) -> Result {
        let mut builder = SmtpClientBuilder::new(self.args.host.as_str(), self.args.port)
            .implicit_tls(self.args.implicit_tls);
        if let Some(pwd) = &self.args.password {
            let user = self.args.user.as_deref().unwrap_or(&self.args.from);
            builder = builder.credentials((user, pwd.as_str()));
        }
        if self.args.tls {
            debug!("connecting smtp tls client");
            let mut client = builder.connect().await?;
            debug!("sending mail");
            client.send(msg).await?;
        } else {
            debug!("connecting smtp plain client");
            let mut client = builder.connect_plain().await?;
            debug!("sending mail");
            client.send(msg).await?;
        }
        Ok(())
    }
}

impl MailSender for DefaultMailSender {
    #[instrument(
        "send_candidate_mail",
        skip(self, mail),
        fields(mail.kind = %mail.kind, mail.to = mail.to)
    )]
    async fn send_candidate_mail(&self, mail: &CandidateMail) -> Result {
        let rendered = self.render(mail)?;
        let delay = Duration::from_secs(self.args.timeout);
        let mut retry_delay = RETRY_DELAY;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let msg = MessageBuilder::new()
                .from((self.args.from.as_str(), self.args.from.as_str()))
                .to(mail.to.as_str())
                .subject(rendered.subject)
                .text_body(&rendered.text)
                .html_body(&rendered.html);
            let res = match timeout(delay, self.send(msg)).await {
                Ok(res) => res,
                Err(_) => Err(Error::Timeout(delay).into()),
            };
            match res {
                Ok(()) => {
                    return Ok(());
                }
                Err(err) if attempt < self.args.attempts => {
                    warn!("{err}");
                    sleep(retry_delay).await;
                    retry_delay = retry_delay.saturating_mul(2);
                }
                Err(err) => {
                    return Err(err);
                }
            }
        }
    }
}

// Functions

fn template_vars(mail: &CandidateMail) -> Object {
    object!({
        "first_name": &mail.first_name,
        "link": mail.link.as_deref().unwrap_or_default(),
    })
}

// super::Error

impl From<Error> for super::Error {
    fn from(err: Error) -> Self {
        Self(Box::new(err))
    }
}

impl From<liquid::Error> for super::Error {
    fn from(err: liquid::Error) -> Self {
        Error::Liquid(err).into()
    }
}

impl From<mail_send::Error> for super::Error {
    fn from(err: mail_send::Error) -> Self {
        Error::Mail(err).into()
    }
}

// Tests
