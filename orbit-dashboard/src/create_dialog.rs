//! Controller behind the "create workspace" dialog.
//!
//! The view owns rendering only. It forwards input to
//! [`CreateWorkspaceDialog`], sends the [`WorkspaceInput`] returned by
//! [`CreateWorkspaceDialog::submit`] and hands the outcome back to
//! [`CreateWorkspaceDialog::complete`].

use orbit_api_schema::{
    error::ApiErrorCode,
    workspace::create::{CreateWorkspaceResponse, ValidationError, WorkspaceInput},
};

use crate::{
    mutation::MutationState,
    query::{QueryCache, QueryKey},
    toast::{Notifier, Toast},
};

pub const CREATE_FAILED_MESSAGE: &str = "Failed to create workspace, try again!";

/// Remote create-workspace procedure as seen by the dialog.
pub trait WorkspaceApi {
    fn create_workspace(
        &self,
        input: &WorkspaceInput,
    ) -> Result<CreateWorkspaceResponse, ApiErrorCode>;
}

#[derive(Debug, Default)]
pub struct CreateWorkspaceDialog {
    open: bool,
    name: String,
    name_error: Option<ValidationError>,
    mutation: MutationState<CreateWorkspaceResponse>,
}

impl CreateWorkspaceDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    /// Closing is refused while a request is in flight.
    pub fn close(&mut self) {
        if !self.mutation.is_pending() {
            self.open = false;
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.name_error = None;
    }

    pub fn name_error(&self) -> Option<ValidationError> {
        self.name_error
    }

    pub fn mutation(&self) -> &MutationState<CreateWorkspaceResponse> {
        &self.mutation
    }

    pub fn is_pending(&self) -> bool {
        self.mutation.is_pending()
    }

    /// Validates the form. Returns the input to send, or `None` when the form
    /// is invalid or a request is already in flight.
    pub fn submit(&mut self) -> Option<WorkspaceInput> {
        if self.mutation.is_pending() {
            log::debug!("create workspace already in flight");
            return None;
        }
        match WorkspaceInput::new(&self.name) {
            Ok(input) => {
                self.name_error = None;
                self.mutation.begin();
                Some(input)
            }
            Err(e) => {
                self.name_error = Some(e);
                None
            }
        }
    }

    pub fn complete<V>(
        &mut self,
        result: Result<CreateWorkspaceResponse, ApiErrorCode>,
        cache: &mut QueryCache<V>,
        notifier: &mut impl Notifier,
    ) {
        match &result {
            Ok(created) => {
                notifier.notify(Toast::success(format!(
                    "Workspace {} created successfully",
                    created.workspace_name
                )));
                cache.invalidate(&QueryKey::workspace_list());
                self.name.clear();
                self.name_error = None;
                self.open = false;
            }
            Err(code) => {
                log::warn!("create workspace failed: {code}");
                notifier.notify(Toast::error(CREATE_FAILED_MESSAGE));
            }
        }
        self.mutation.settle(result);
    }

    /// Runs a whole submission against `api`. Returns `None` when nothing was
    /// sent.
    pub fn submit_with<V>(
        &mut self,
        api: &impl WorkspaceApi,
        cache: &mut QueryCache<V>,
        notifier: &mut impl Notifier,
    ) -> Option<Result<CreateWorkspaceResponse, ApiErrorCode>> {
        let input = self.submit()?;
        let result = api.create_workspace(&input);
        self.complete(result.clone(), cache, notifier);
        Some(result)
    }
}
