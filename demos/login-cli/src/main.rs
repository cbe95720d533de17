//! Interactive sign-in walkthrough
//!
//! Demonstrates the full external-auth flow:
//! 1. Check for a stored session
//! 2. Initiate external authentication and print the authorization URL
//! 3. User signs in with the identity provider and copies the callback code
//! 4. Exchange code + state for a token pair
//! 5. The pair is stored; every subscribed context is notified
//!
//! Run with: cargo run -p holipoly-login-cli -- https://demo.holipoly.io/graphql/

use anyhow::{Context, bail};
use holipoly_auth_sdk::{AuthEvent, HolipolyAuthClient};
use std::io::{BufRead, Write};

const DEFAULT_REDIRECT_URL: &str = "http://localhost:3000/auth/callback";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "holipoly_auth_sdk=debug".parse().unwrap()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(base_url) = args.next() else {
        print_help();
        return Ok(());
    };

    let client = HolipolyAuthClient::new(&base_url);

    match args.next().as_deref() {
        Some("logout") => return logout(&client),
        Some("status") => return status(&client),
        Some("refresh") => return refresh(&client).await,
        Some(other) => {
            eprintln!("Unknown command: {other}");
            print_help();
            return Ok(());
        }
        None => {}
    }

    if let Some(pair) = client.get_auth_state() {
        println!("✓ Already signed in");
        println!("  {}", pair.authorization_header());
        println!();
        println!("To sign out: cargo run -p holipoly-login-cli -- {base_url} logout");
        return Ok(());
    }

    // Watch for the notification the same way any other context would
    let mut events = client.subscribe();

    println!("🔐 Holipoly external authentication");
    println!();

    let auth_url = client
        .initiate(DEFAULT_REDIRECT_URL)
        .await
        .context("could not initiate external authentication")?;

    println!("To sign in, please:");
    println!("  1. Open the following URL in your browser");
    println!("  2. Sign in with your identity provider");
    println!("  3. Copy the code and state shown after approval");
    println!("  4. Paste them below as code#state");
    println!();
    println!("Authorization URL:");
    println!("  {auth_url}");
    println!();

    let (code, state) = prompt_for_code()?;
    if code.is_empty() || code.eq_ignore_ascii_case("cancel") {
        bail!("sign-in cancelled");
    }

    let pair = client
        .sign_in(&code, &state)
        .await
        .context("code exchange failed")?;

    println!();
    println!("✓ Signed in successfully!");
    println!("  {}", pair.authorization_header());

    if let Ok(AuthEvent::SignedIn) = events.try_recv() {
        println!("  (signedIn notification delivered)");
    }

    Ok(())
}

/// Prompt for the `code#state` pair shown by the callback page
fn prompt_for_code() -> anyhow::Result<(String, String)> {
    print!("Enter code#state (or 'cancel' to abort): ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().lock().read_line(&mut input)?;
    let input = input.trim();

    match input.split_once('#') {
        Some((code, state)) => Ok((code.to_string(), state.to_string())),
        None => Ok((input.to_string(), String::new())),
    }
}

async fn refresh(client: &HolipolyAuthClient) -> anyhow::Result<()> {
    let pair = client
        .refresh()
        .await
        .context("refresh failed - the stored session is no longer valid")?;

    println!("✓ Refreshed");
    println!("  {}", pair.authorization_header());
    Ok(())
}

fn logout(client: &HolipolyAuthClient) -> anyhow::Result<()> {
    client.sign_out()?;
    println!("✓ Signed out");
    Ok(())
}

fn status(client: &HolipolyAuthClient) -> anyhow::Result<()> {
    match client.get_auth_state() {
        Some(pair) => {
            println!("✓ Signed in");
            println!("  access token:  {}...", head(&pair.token));
            println!("  refresh token: {}...", head(&pair.refresh_token));
        }
        None => println!("✗ Not signed in"),
    }
    Ok(())
}

/// First few characters of a token, for display
fn head(token: &str) -> &str {
    match token.char_indices().nth(12) {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}

fn print_help() {
    println!("Usage: holipoly-login-cli <backend-graphql-url> [command]");
    println!();
    println!("Commands:");
    println!("  (none)   Sign in via the backend's external auth plugin");
    println!("  status   Show the stored session");
    println!("  refresh  Exchange the stored refresh token for a new pair");
    println!("  logout   Clear the stored session and notify other contexts");
}
