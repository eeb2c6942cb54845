//! Session validation and group discovery.

use super::SyncPipeline;
use crate::error::{Error, Result};
use crate::store::LoginProvider;
use crate::types::{Group, PipelineState, SessionStatus, SessionToken};
use crate::wordbook;

impl SyncPipeline {
    /// Start a run: validate `token` and list the remote groups
    ///
    /// Any previous run is discarded. A rejected session returns
    /// [`Error::Auth`]; fresh credentials are needed (see
    /// [`login_and_start`](Self::login_and_start)).
    pub async fn start(&mut self, token: &SessionToken) -> Result<Vec<Group>> {
        self.reset_run();
        self.set_state(PipelineState::ValidatingSession);

        let status = match self.wordbook.validate(token).await {
            Ok(status) => status,
            Err(e) => return self.abort(e),
        };
        let landing = match status {
            SessionStatus::Valid(landing) => landing,
            SessionStatus::Invalid => {
                let error = Error::Auth(format!("session rejected by {}", self.wordbook.name()));
                return self.abort(error);
            }
        };

        self.wordbook.use_session(token);
        self.groups = self.wordbook.list_groups(&landing);
        tracing::info!(service = self.wordbook.name(), groups = self.groups.len(), "session validated");
        self.set_state(PipelineState::SelectingGroups);
        Ok(self.groups.clone())
    }

    /// Log in through `provider`, then [`start`](Self::start) with the new session
    ///
    /// Returns the new token so the caller can store it for later runs.
    pub async fn login_and_start(
        &mut self,
        provider: &dyn LoginProvider,
    ) -> Result<(SessionToken, Vec<Group>)> {
        let wordbook = self.wordbook.clone();
        let succeeded = move |cookies: &SessionToken, page: &str| wordbook.login_succeeded(cookies, page);

        tracing::info!(service = self.wordbook.name(), "requesting login");
        let token = provider.login(self.wordbook.login_url(), &succeeded).await?;
        let groups = self.start(&token).await?;
        Ok((token, groups))
    }

    /// Groups selected on the previous run that still exist, in service order
    pub fn preselected_groups(&self) -> Vec<Group> {
        wordbook::preselected(&self.groups, &self.config.sync.selected_groups)
    }
}
