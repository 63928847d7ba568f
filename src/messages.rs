//! Catalog of canned messages for situations most services log.
//!
//! Each template has a matching method on [`Logger`] that fills it in and
//! sends it at a fixed level, with the logger-wide custom fields.

use crate::logger::Logger;
use std::future::Future;

// Info
pub const HTTP_SERVER_STARTED: &str = "Started, listening on port: {port}";

// Warning
pub const HTTP_SERVER_UNAUTHORIZED: &str = "{request} tried to connect on resource: {resource}, but it’s unauthorized.";
pub const HTTP_CLIENT_UNAUTHORIZED: &str = "I’m trying to connect to {server} but I’m unauthorized.";
pub const HTTP_SERVER_INVALID_BODY: &str = "{request} sent a request but I don’t know how to read the body.";
pub const HTTP_CLIENT_INVALID_BODY: &str = "I sent {body} to {server} but he can’t read it";
pub const HTTP_SERVER_SEND_RESPONSE: &str = "Can't send the response, error: {error}";
pub const DATABASE_ADD_ERROR: &str = "Can't add {entity} for {owner}";
pub const DATABASE_GET_ERROR: &str = "Can't get {entity} for {owner}";

// Error
pub const DATABASE_CONNECTION_ERROR: &str = "Invalid connection to the database: {host}";

// Fatal
pub const HTTP_SERVER_STARTING_ERROR: &str = "Error starting HTTP server on port: {port}";
pub const MISSING_ENV_VAR: &str = "Missing environment variable: {name}";
pub const MISSING_ENTITY: &str = "Can't get: {name}";

/// Substitute `{name}` placeholders in a catalog template.
pub fn render(template: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(template.to_string(), |message, (name, value)| {
        message.replace(&format!("{{{}}}", name), value)
    })
}

impl Logger {
    #[track_caller]
    pub fn http_server_started(&self, port: &str) {
        self.info(render(HTTP_SERVER_STARTED, &[("port", port)]), None);
    }

    #[track_caller]
    pub fn http_server_unauthorized_response(&self, request: &str, resource: &str) {
        self.warn(
            render(HTTP_SERVER_UNAUTHORIZED, &[("request", request), ("resource", resource)]),
            None,
        );
    }

    #[track_caller]
    pub fn http_server_invalid_body_response(&self, request: &str) {
        self.warn(render(HTTP_SERVER_INVALID_BODY, &[("request", request)]), None);
    }

    #[track_caller]
    pub fn http_server_send_response_error(&self, error: &str) {
        self.warn(render(HTTP_SERVER_SEND_RESPONSE, &[("error", error)]), None);
    }

    #[track_caller]
    pub fn http_client_unauthorized(&self, server: &str) {
        self.warn(render(HTTP_CLIENT_UNAUTHORIZED, &[("server", server)]), None);
    }

    #[track_caller]
    pub fn http_client_invalid_body(&self, body: &str, server: &str) {
        self.warn(
            render(HTTP_CLIENT_INVALID_BODY, &[("body", body), ("server", server)]),
            None,
        );
    }

    #[track_caller]
    pub fn database_add_error(&self, entity: &str, owner: &str) {
        self.warn(render(DATABASE_ADD_ERROR, &[("entity", entity), ("owner", owner)]), None);
    }

    #[track_caller]
    pub fn database_get_error(&self, entity: &str, owner: &str) {
        self.warn(render(DATABASE_GET_ERROR, &[("entity", entity), ("owner", owner)]), None);
    }

    #[track_caller]
    pub fn invalid_database_connection(&self, host: &str) {
        self.error(render(DATABASE_CONNECTION_ERROR, &[("host", host)]), None);
    }

    #[track_caller]
    pub fn http_server_starting_error(&self, port: &str) -> impl Future<Output = ()> + '_ {
        self.fatal(render(HTTP_SERVER_STARTING_ERROR, &[("port", port)]), None)
    }

    #[track_caller]
    pub fn missing_env_var(&self, name: &str) -> impl Future<Output = ()> + '_ {
        self.fatal(render(MISSING_ENV_VAR, &[("name", name)]), None)
    }

    #[track_caller]
    pub fn missing_entity(&self, name: &str) -> impl Future<Output = ()> + '_ {
        self.fatal(render(MISSING_ENTITY, &[("name", name)]), None)
    }
}
