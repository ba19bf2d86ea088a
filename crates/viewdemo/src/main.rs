//! Runs a host bridge and a simulated page bridge over an in-memory channel.
//!
//! The page side stands in for the script running inside the web view: it
//! exposes a few functions and the script-loading helper, and calls back into
//! the host once.

use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use serde_json::json;
use tracing::info;
use tracing::warn;
use viewrun::Api;
use viewrun::Bridge;
use viewrun::RemoteError;
use viewrun::ScriptLoader;
use viewrun::bridge;
use viewrun::loader::FetchScript;
use viewrun::mock_transport::DuplexChannelTransport;
use viewrun::remote_methods;

remote_methods! {
    /// Adds two integers on the page.
    Add = "add"(i64, i64) -> i64;
    /// Asks the host for the window title.
    Title = "title"() -> String;
}

fn page_api() -> Api {
    Api::new()
        .implement::<Add, _, _, _>(|(a, b)| async move { Ok::<_, RemoteError>(a + b) })
        .expose("fail", |(): ()| async {
            Err::<(), _>(RemoteError::new("Error", "boom").with_stack("Error: boom\n    at fail (app.js:1:7)"))
        })
        .implement::<FetchScript, _, _, _>(|(url,)| async move {
            // A real page appends a <script> element and waits for its load event.
            tokio::time::sleep(Duration::from_millis(10)).await;
            info!(%url, "page loaded script");
            Ok::<_, RemoteError>(Value::Null)
        })
}

fn host_api() -> Api {
    Api::new().implement::<Title, _, _, _>(|()| async { Ok::<_, RemoteError>("viewdemo".to_string()) })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    viewrun::logging::init();

    let (host_end, page_end) = DuplexChannelTransport::pair();
    let host = Bridge::builder(host_end)
        .name("host")
        .api(host_api())
        .load_timeout(Some(Duration::from_secs(5)))
        .build()
        .context("building host bridge")?;
    let page = Bridge::builder(page_end)
        .name("page")
        .api(page_api())
        .build()
        .context("building page bridge")?;

    host.listen();
    page.listen();
    page.ready().wait().await;

    let sum = host.call::<Add>((2, 3)).await?;
    info!(sum, "add(2, 3)");

    let raw = host.invoke("add", &json!([20, 22])).await;
    info!(?raw, "a JSON list spreads into positional arguments");

    match host.invoke("fail", &()).await {
        Err(bridge::Error::Remote(error)) => info!(name = %error.name, message = %error.message, "fail() rejected"),
        other => warn!(?other, "fail() should have rejected"),
    }

    let title = page.call::<Title>(()).await?;
    info!(%title, "page asked host for its title");

    ScriptLoader::new(&host)
        .load("https://example.test/app.js")
        .await
        .context("loading app.js")?;

    info!(
        host_pending = host.pending_count(),
        page_pending = page.pending_count(),
        "done"
    );
    Ok(())
}
