use autoform::{Education, Experience, FillEngine, Profile, Session};

const DEMO_FORM: &str = r#"<!doctype html>
<html><body><h1>Application</h1><form>
  <label for="name">Full Name</label>
  <input id="name" name="name" type="text" required>
  <label for="email">Email Address</label>
  <input id="email" name="contact_email" type="email" required>
  <label for="phone">Phone</label>
  <input id="phone" name="phone" type="tel">
  <label for="company">Current company</label>
  <input id="company" name="company" type="text">
  <label for="degree">Degree</label>
  <select id="degree" name="degree">
    <option value="">-- select --</option>
    <option value="bs">Bachelor's</option>
    <option value="ms">Master's</option>
    <option value="phd">PhD</option>
  </select>
  <p>Skills</p>
  <label><input type="checkbox" name="skills" value="rust"> Rust</label>
  <label><input type="checkbox" name="skills" value="python"> Python</label>
  <label><input type="checkbox" name="skills" value="sql"> SQL</label>
  <label for="about">Responsibilities</label>
  <textarea id="about" name="about"></textarea>
  <label for="fav">Favorite color</label>
  <input id="fav" name="fav" type="text">
</form></body></html>"#;

#[tokio::main]
async fn main() -> autoform::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autoform=debug".into()),
        )
        .init();

    let profile = Profile {
        full_name: "Jane Doe".into(),
        email: "jane@example.com".into(),
        phone: "555-0100".into(),
        education: vec![Education {
            institution: "MIT".into(),
            degree: "Bachelor of Science".into(),
            field: "Computer Science".into(),
            start_date: Some("2015-09".into()),
            end_date: Some("2019-06".into()),
        }],
        experience: vec![Experience {
            employer: "Acme Corp".into(),
            title: "Software Engineer".into(),
            start_date: Some("2019-07".into()),
            end_date: None,
            description: Some("Built data pipelines and internal tooling.".into()),
        }],
        skills: vec!["Rust".into(), "SQL".into()],
        ..Profile::default()
    };

    let session = Session::builder().headless(true).build().await?;
    let page = session.new_page("about:blank").await?;
    // Pass a URL to run against a live form; the built-in demo form is the
    // default.
    match std::env::args().nth(1) {
        Some(url) => page.goto(&url).await?,
        None => {
            let js = format!(
                "document.open(); document.write({}); document.close();",
                serde_json::to_string(DEMO_FORM)
                    .map_err(|e| autoform::Error::JsError(e.to_string()))?
            );
            page.evaluate_void(&js).await?;
        }
    }

    let report = FillEngine::new().run(&profile, &page).await?;
    println!("{report}");

    Ok(())
}
