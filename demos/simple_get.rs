use fluent_request::new_request;

fn main() -> anyhow::Result<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://github.com/violanes".to_owned());

    let response = new_request()
        .follow_redirects()
        .get(&url)
        .error_for_status()?;

    println!("{} -> {}", url, response.status());
    println!("{}", response.body());
    Ok(())
}
