//! Command dispatch
//!
//! Each subcommand returns the text to print. Failures carrying a
//! [`ClientError`] are reported with its inline message.

use std::path::PathBuf;

use anyhow::Context;
use clap::ArgMatches;
use mdm_client::{
    ClientConfig, ClientError, ContextKey, MdmApi, Organization, PolicyEditor, Session, SessionContext,
    SessionStore, SyncGateway, View,
};
use mdm_policy::{Edit, PolicyPath, SchemaRegistry};

use crate::dashboard::Dashboard;
use crate::{edits, render};

/// Shown by `whoami` without a session
pub const NOT_LOGGED_IN: &str = "Not logged in.";

/// Message to show for a failed command
#[must_use]
pub fn user_message(error: &anyhow::Error) -> String {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ClientError>())
        .map_or_else(|| format!("{error:#}"), ClientError::user_message)
}

/// Console bound to one configuration and session
#[derive(Debug)]
pub struct Console {
    config: ClientConfig,
    api: MdmApi,
    session: SessionContext,
}

impl Console {
    /// Console persisting its session to the configured file
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built or the stored session is unreadable
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let session = SessionContext::new(SessionStore::new(&config.session_file));
        session.restore()?;
        Self::with_session(config, session)
    }

    /// Console over an existing session context
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn with_session(config: ClientConfig, session: SessionContext) -> Result<Self, ClientError> {
        let api = MdmApi::new(&config)?;
        Ok(Self { config, api, session })
    }

    /// Active session
    #[inline]
    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Run the parsed subcommand
    ///
    /// # Errors
    /// Returns the first failure of the command
    pub async fn run(&self, matches: &ArgMatches) -> anyhow::Result<String> {
        match matches.subcommand() {
            Some(("login", args)) => self.login(args).await,
            Some(("logout", _)) => {
                self.session.logout().map_err(ClientError::from)?;
                Ok("Logged out.".to_string())
            }
            Some(("whoami", _)) => Ok(self.whoami()),
            Some(("orgs", _)) => self.orgs().await,
            Some(("devices", args)) => self.devices(args).await,
            Some(("enroll", args)) => self.enroll(args).await,
            Some(("locate", args)) => self.locate(args).await,
            Some(("employees", _)) => self.employees().await,
            Some(("link-device", args)) => self.link(args, true).await,
            Some(("unlink-device", args)) => self.link(args, false).await,
            Some(("policy", args)) => self.policy(args).await,
            Some((other, _)) => anyhow::bail!("unknown command '{other}'"),
            None => anyhow::bail!("no command given"),
        }
    }

    async fn login(&self, args: &ArgMatches) -> anyhow::Result<String> {
        let email = required(args, "email")?;
        let password = required(args, "password")?;

        let mut events = self.session.subscribe();
        let response = self.api.login(email, password).await?;
        let session = self.session.establish(response.token).map_err(ClientError::from)?;

        let dashboard = events
            .try_recv()
            .ok()
            .and_then(|event| Dashboard::on_event(&event))
            .unwrap_or_else(|| Dashboard::for_role(session.role()));
        Ok(format!(
            "Logged in as {}.\nLanding view: {}\n{}",
            display_role(&session),
            dashboard.active(),
            dashboard.tab_bar()
        ))
    }

    fn whoami(&self) -> String {
        let Some(session) = self.session.current() else {
            return NOT_LOGGED_IN.to_string();
        };
        let dashboard = Dashboard::for_role(session.role());
        format!(
            "Role: {}\nLanding view: {}\n{}",
            display_role(&session),
            dashboard.active(),
            dashboard.tab_bar()
        )
    }

    /// Switch the session's dashboard to `view` and return the bearer token
    fn open(&self, view: View) -> anyhow::Result<String> {
        let session = self.session.current().ok_or(ClientError::NotAuthenticated)?;
        Dashboard::for_role(session.role()).select(view)?;
        Ok(session.token().to_string())
    }

    /// Organization named by `--enterprise`, or the user's own
    async fn organization(&self, args: &ArgMatches, token: &str) -> anyhow::Result<Organization> {
        if let Some(name) = args.get_one::<String>("enterprise") {
            return Ok(Organization {
                enterprise_name: Some(name.clone()),
                ..Organization::default()
            });
        }
        Ok(self.api.my_org(token).await?)
    }

    async fn orgs(&self) -> anyhow::Result<String> {
        let token = self.open(View::Organizations)?;
        let orgs = self.api.list_orgs(&token).await?;
        Ok(render::organizations(&orgs))
    }

    async fn devices(&self, args: &ArgMatches) -> anyhow::Result<String> {
        let token = self.open(View::Devices)?;
        let org = self.organization(args, &token).await?;
        let enterprise = org.enterprise().ok_or(ClientError::MissingEnterprise)?;
        let devices = self.api.list_devices(enterprise, &token).await?;
        Ok(render::devices(&devices))
    }

    async fn enroll(&self, args: &ArgMatches) -> anyhow::Result<String> {
        let token = self.open(View::Enterprise)?;
        let org = self.organization(args, &token).await?;
        let enterprise_id = org
            .enterprise_id
            .clone()
            .or_else(|| org.enterprise().and_then(|n| n.rsplit('/').next()).map(str::to_string))
            .ok_or(ClientError::MissingEnterprise)?;

        let image = self
            .api
            .enrollment_qr(&enterprise_id, &self.config.policy_id, &token)
            .await?;
        let output = args
            .get_one::<PathBuf>("output")
            .cloned()
            .unwrap_or_else(|| PathBuf::from("enrollment-qr.png"));
        std::fs::write(&output, &image.bytes)
            .with_context(|| format!("failed to write QR code to {}", output.display()))?;
        tracing::info!("Saved enrollment QR code to {}", output.display());

        let mut out = String::new();
        if org.enterprise_name.is_some() && !org.name.is_empty() {
            out.push_str(&render::organization(&org));
            out.push('\n');
        }
        out.push_str(&format!(
            "Wrote {} QR code ({} bytes) to {}",
            image.content_type,
            image.bytes.len(),
            output.display()
        ));
        Ok(out)
    }

    async fn locate(&self, args: &ArgMatches) -> anyhow::Result<String> {
        let token = self.open(View::Devices)?;
        let serial = required(args, "serial")?;
        let location = self.api.device_location(serial, &token).await?;
        Ok(render::location(serial, location.as_ref()))
    }

    async fn employees(&self) -> anyhow::Result<String> {
        let token = self.open(View::Users)?;
        let employees = self.api.list_employees(&token).await?;
        Ok(render::employees(&employees))
    }

    async fn link(&self, args: &ArgMatches, attach: bool) -> anyhow::Result<String> {
        let token = self.open(View::Users)?;
        let employee = required(args, "employee")?;
        let device = required(args, "device")?;
        if attach {
            self.api.link_device(employee, device, &token).await?;
            Ok(format!("Linked device {device} to employee {employee}."))
        } else {
            self.api.unlink_device(employee, device, &token).await?;
            Ok(format!("Unlinked device {device} from employee {employee}."))
        }
    }

    async fn policy(&self, args: &ArgMatches) -> anyhow::Result<String> {
        let token = self.open(View::Policies)?;
        let org = self.organization(args, &token).await?;
        let key = match ContextKey::from_session(&org, &self.session) {
            Ok(key) => Some(key),
            Err(ClientError::MissingEnterprise) => None,
            Err(e) => return Err(e.into()),
        };

        let gateway = SyncGateway::new(self.api.clone(), self.config.policy_id.clone());
        let mut editor = PolicyEditor::new(gateway, key);
        let (command, sub) = args.subcommand().context("missing policy command")?;

        if let Some(placeholder) = editor.placeholder() {
            return match command {
                "show" | "form" => Ok(placeholder.to_string()),
                _ => Err(ClientError::MissingEnterprise.into()),
            };
        }
        editor.refresh().await?;

        let registry = SchemaRegistry::standard();
        let edits = match command {
            "show" => {
                let text = match sub.get_one::<String>("format").map(String::as_str) {
                    Some("yaml") => editor.document().to_yaml().map_err(ClientError::from)?,
                    _ => editor.document().to_json_pretty().map_err(ClientError::from)?,
                };
                return Ok(text);
            }
            "form" => {
                let form = editor.form();
                return match sub.get_one::<String>("field") {
                    Some(field) => form
                        .control(field)
                        .map(|control| control.to_string().trim_end().to_string())
                        .with_context(|| format!("unknown policy field '{field}'")),
                    None => Ok(form.render_text()),
                };
            }
            "set" => vec![edits::for_set(registry, path(sub)?, required(sub, "value")?)?],
            "toggle" => vec![Edit::FlipToggle { path: path(sub)? }],
            "add" => edits::for_add(
                registry,
                editor.document(),
                path(sub)?,
                sub.get_one::<String>("item").map(String::as_str),
            )?,
            "remove" => {
                let index = sub.get_one::<usize>("index").copied().context("missing index")?;
                vec![edits::for_remove(registry, path(sub)?, index)]
            }
            other => anyhow::bail!("unknown policy command '{other}'"),
        };

        for edit in edits {
            tracing::debug!("Applying {:?}", edit);
            editor.edit(edit).map_err(ClientError::from)?;
        }
        editor.save().await?;

        let mut out = editor.form().render_text();
        if let Some(message) = &editor.status().save_success {
            out.push('\n');
            out.push_str(message);
        }
        if let Some(reload) = &editor.status().error {
            out.push_str(&format!("\nShowing local copy: {reload}"));
        }
        Ok(out)
    }
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing argument '{name}'"))
}

fn path(args: &ArgMatches) -> anyhow::Result<PolicyPath> {
    let raw = required(args, "path")?;
    raw.parse::<PolicyPath>()
        .with_context(|| format!("invalid policy path '{raw}'"))
}

fn display_role(session: &Session) -> String {
    match session.role().as_str() {
        "" => "(no role)".to_string(),
        role => role.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::Unavailable;
    use mdm_client::Role;
    use mdm_test_utils::make_jwt;

    fn console(session: SessionContext) -> Console {
        let config = ClientConfig::new().with_base_url("http://127.0.0.1:9/api");
        Console::with_session(config, session).unwrap()
    }

    #[test]
    fn user_message_prefers_client_error() {
        let error = anyhow::Error::from(ClientError::NotAuthenticated).context("while listing");
        assert_eq!(user_message(&error), "Please log in first.");
        assert_eq!(user_message(&anyhow::anyhow!("plain")), "plain");
    }

    #[test]
    fn whoami_without_session() {
        assert_eq!(console(SessionContext::in_memory()).whoami(), NOT_LOGGED_IN);
    }

    #[test]
    fn whoami_lists_tabs() {
        let session = SessionContext::in_memory();
        session.establish(make_jwt("SUPER_ADMIN")).unwrap();
        let out = console(session).whoami();
        assert!(out.starts_with("Role: SUPER_ADMIN"));
        assert!(out.contains("Organizations"));
    }

    #[test]
    fn member_cannot_open_organizations() {
        let session = SessionContext::in_memory();
        session.establish(make_jwt("ADMIN")).unwrap();
        let error = console(session).open(View::Organizations).unwrap_err();
        assert!(error.downcast_ref::<Unavailable>().is_some());
    }

    #[test]
    fn commands_need_a_session() {
        let error = console(SessionContext::in_memory()).open(View::Devices).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ClientError>(),
            Some(ClientError::NotAuthenticated)
        ));
    }

    #[test]
    fn blank_role_is_labelled() {
        let session = Session::new("t", Role::from_claim(""));
        assert_eq!(display_role(&session), "(no role)");
    }
}
