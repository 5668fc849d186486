use std::sync::Arc;

use ticketflow_core::{Authenticator, Config, IngressService, SharedSecret, TicketService};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    ingress_token: SharedSecret,
    ingress: IngressService,
    tickets: TicketService,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        ingress: IngressService,
        tickets: TicketService,
    ) -> Self {
        let ingress_token = SharedSecret::new(config.ingress.token.clone());
        Self {
            config,
            authenticator,
            ingress_token,
            ingress,
            tickets,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    /// Check the webhook `token` query parameter.
    pub fn verify_ingress_token(&self, token: Option<&str>) -> bool {
        token.is_some_and(|token| self.ingress_token.verify(token))
    }

    pub fn ingress(&self) -> &IngressService {
        &self.ingress
    }

    pub fn tickets(&self) -> &TicketService {
        &self.tickets
    }
}
