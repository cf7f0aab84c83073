use fluent_request::{new_request, RequestOptions};

fn main() -> anyhow::Result<()> {
    let url = std::env::var("FLUENT_REQUEST_DEMO_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8001/api/items".to_owned());
    let opts = RequestOptions::from_env()?;

    let response = new_request()
        .with_options(opts)
        .with_token("debug")
        .with_header("kek", 3)
        .with_headers([("test", "123"), ("hello", "lol")])
        .with_header("lol", "test")
        .retry(3, 100)
        .with_body(r#"{"hello":"world"}"#)
        .timeout(300)
        .follow_redirects()
        .post(&url);

    if response.is_failed() {
        anyhow::bail!("request to {url} failed: {:?}", response.error());
    }

    let body: serde_json::Value = response.json()?;
    println!("{body:#}");
    Ok(())
}
