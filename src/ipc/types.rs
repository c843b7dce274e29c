use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

/// One JSON-lines request from the host application. `params` defaults to
/// null so methods without arguments need no empty object.
#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything the sidecar holds between requests: the selected workspace
/// directory and the open database, if any. No snapshots are cached; each
/// read rebuilds its view from the database.
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
}
