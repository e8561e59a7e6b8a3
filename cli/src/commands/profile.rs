use anyhow::{Result, bail};

use larder_core::models::UserContext;

use crate::config::Config;

pub(crate) fn cmd_profile_show(user: &UserContext, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(user)?);
        return Ok(());
    }

    let id = &user.user_id;
    let name = &user.display_name;
    let email = user.email.as_deref().unwrap_or("(not set)");
    println!("User id: {id}");
    println!("Name:    {name}");
    println!("Email:   {email}");
    Ok(())
}

pub(crate) fn cmd_profile_set(
    config: &Config,
    user: &UserContext,
    name: Option<String>,
    email: Option<String>,
    json: bool,
) -> Result<()> {
    if name.is_none() && email.is_none() {
        bail!("Nothing to update. Provide --name and/or --email");
    }

    // The user id is stable for the lifetime of the profile; only the
    // display fields change.
    let updated = UserContext {
        user_id: user.user_id.clone(),
        display_name: name.unwrap_or_else(|| user.display_name.clone()),
        email: email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .or_else(|| user.email.clone()),
    };
    config.save_profile(&updated)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else {
        let name = &updated.display_name;
        let email = updated.email.as_deref().unwrap_or("(not set)");
        println!("Updated profile: {name} <{email}>");
    }
    Ok(())
}
