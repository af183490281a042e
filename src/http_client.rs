use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

use crate::config::HttpSettings;

static CLIENT: OnceCell<Client> = OnceCell::new();
static STREAM_CLIENT: OnceCell<Client> = OnceCell::new();

/// Client for single round-trip calls. The first caller's settings win.
pub fn http_client(settings: &HttpSettings) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(settings.connect_timeout)
            .build()
            .context("failed to build http client")
    })
}

/// The analyze stream can run for minutes. The blocking client applies its
/// timeout to each body read, so it bounds the gap between chunks rather than
/// the whole stream.
pub fn stream_client(settings: &HttpSettings) -> Result<&'static Client> {
    STREAM_CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(settings.stream_idle_timeout)
            .connect_timeout(settings.connect_timeout)
            .build()
            .context("failed to build stream client")
    })
}
