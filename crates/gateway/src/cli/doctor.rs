use tb_domain::config::{Config, ConfigSeverity};

/// Run all diagnostic checks and print a summary.
///
/// Returns `true` when every check passes.
pub fn run(config: &Config, config_path: &str) -> bool {
    println!("ticketbot doctor");
    println!("================\n");

    let mut all_passed = true;

    check_config_file(config_path, &mut all_passed);
    check_config_validation(config, &mut all_passed);
    check_secrets(config, &mut all_passed);
    check_state_dir(config, &mut all_passed);
    check_dead_payments(config, &mut all_passed);

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }
    all_passed
}

// ── Individual checks ─────────────────────────────────────────────────

fn check_config_file(config_path: &str, all_passed: &mut bool) {
    let exists = std::path::Path::new(config_path).exists();
    print_check(
        "Config file exists",
        exists,
        if exists {
            config_path.to_owned()
        } else {
            format!("{config_path} not found (using defaults)")
        },
    );
    if !exists {
        *all_passed = false;
    }
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();

    if issues.is_empty() {
        print_check("Config validation", true, "no issues".into());
        return;
    }
    print_check(
        "Config validation",
        error_count == 0,
        format!("{} issue(s) ({error_count} error(s))", issues.len()),
    );
    for issue in &issues {
        println!("      {issue}");
    }
    if error_count > 0 {
        *all_passed = false;
    }
}

/// The environment variables the server resolves at startup.
fn secret_vars(config: &Config) -> [(&'static str, &str); 6] {
    [
        ("LLM API key", config.llm.api_key_env.as_str()),
        ("Backend API key", config.backend.api_key_env.as_str()),
        ("Messages URL", config.whatsapp.messages_url_env.as_str()),
        ("Access token", config.whatsapp.access_token_env.as_str()),
        ("Verify token", config.whatsapp.verify_token_env.as_str()),
        ("Business account id", config.whatsapp.business_account_id_env.as_str()),
    ]
}

fn check_secrets(config: &Config, all_passed: &mut bool) {
    for (label, var) in secret_vars(config) {
        let set = std::env::var(var).is_ok_and(|v| !v.trim().is_empty());
        print_check(
            label,
            set,
            if set {
                format!("{var} is set")
            } else {
                format!("{var} is not set")
            },
        );
        if !set {
            *all_passed = false;
        }
    }
}

fn check_state_dir(config: &Config, all_passed: &mut bool) {
    let path = &config.conversation.state_path;
    let ok = std::fs::create_dir_all(path).is_ok() && {
        let marker = path.join(".ticketbot_doctor_write_check");
        let w = std::fs::write(&marker, b"ok").is_ok();
        let _ = std::fs::remove_file(&marker);
        w
    };
    let detail = if ok {
        format!("{} (writable)", path.display())
    } else {
        format!("{} (not writable)", path.display())
    };
    print_check("State directory", ok, detail);
    if !ok {
        *all_passed = false;
    }
}

fn check_dead_payments(config: &Config, all_passed: &mut bool) {
    let (ok, detail) = match crate::runtime::queue::dead_letters(&config.conversation.state_path) {
        Ok(dead) if dead.is_empty() => (true, "none".to_owned()),
        Ok(dead) => (
            false,
            format!("{} job(s); inspect with `ticketbot payments dead`", dead.len()),
        ),
        Err(e) => (false, format!("unreadable: {e}")),
    };
    print_check("Dead payment jobs", ok, detail);
    if !ok {
        *all_passed = false;
    }
}

// ── Formatting helper ─────────────────────────────────────────────────

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
