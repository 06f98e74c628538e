use crate::app::App;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde_json::json;
use std::io::{self, BufRead};

fn prompt_email(output: &Output) -> Result<String> {
    output.prompt("Email: ")?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let email = line.trim().to_string();
    if email.is_empty() {
        return Err(eyre!("An email address is required"));
    }
    Ok(email)
}

pub async fn login(app: &App, email: Option<String>, sign_up: bool, output: &Output) -> Result<()> {
    let identity = app.identity()?;
    let email = match email {
        Some(email) => email,
        None => prompt_email(output)?,
    };
    let password = rpassword::prompt_password("Password: ")
        .map_err(|e| eyre!("Failed to read password: {}", e))?;

    let session = if sign_up {
        identity.sign_up(&email, &password).await
    } else {
        identity.sign_in(&email, &password).await
    };
    let session = session.map_err(|e| match e {
        mktv_sources::SourceError::Unauthorized { message, .. } => eyre!("Sign-in rejected: {}", message),
        other => eyre!("Sign-in failed: {}", other),
    })?;

    let viewer = session.into_viewer(&email);
    app.save_session(&viewer)?;

    output.emit(&viewer, || output.success(format!("Signed in as {}", viewer.email)));
    Ok(())
}

pub fn logout(app: &App, output: &Output) -> Result<()> {
    if !app.session().is_signed_in() {
        output.info("Not signed in");
        return Ok(());
    }
    app.clear_session()?;
    output.success("Signed out");
    Ok(())
}

pub fn whoami(app: &App, output: &Output) -> Result<()> {
    match app.session().current() {
        Some(viewer) => output.emit(&viewer, || {
            println!("{} <{}>", viewer.name(), viewer.email);
            println!("Viewer ID: {}", viewer.id);
        }),
        None => output.emit(&json!({ "signed_in": false, "storage": app.backend_name() }), || {
            println!("Not signed in (records are kept in the {} store)", app.backend_name());
        }),
    }
    Ok(())
}
