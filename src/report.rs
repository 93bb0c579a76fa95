use std::fmt::Write;

use time::format_description::well_known::Rfc3339;

use crate::admin::dto::{ReconcileReport, ResetReport, SeedAction, SeedOutcome, UserListing};

const RULE: &str = "================================================================================";

fn yes_no(v: bool) -> &'static str {
    if v {
        "Yes"
    } else {
        "No"
    }
}

pub fn reconcile(report: &ReconcileReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "✅ {}: {}", report.branch, report.user.email);
    if let Some(legacy) = &report.removed_legacy {
        let _ = writeln!(out, "   legacy email {legacy} no longer present");
    }
    let _ = writeln!(out, "   id: {}", report.user.id);
    let _ = writeln!(out, "   name: {}", report.user.name);
    out
}

pub fn reset(report: &ResetReport) -> String {
    let previous = match report.previously_valid {
        Some(v) => yes_no(v),
        None => "no hash stored",
    };
    let mut out = String::new();
    let _ = writeln!(out, "Password reset for {}", report.email);
    let _ = writeln!(out, "   supplied password matched previous hash: {previous}");
    let _ = writeln!(
        out,
        "   verification: {}",
        if report.verified { "✅ PASS" } else { "❌ FAIL" }
    );
    out
}

pub fn seed(outcomes: &[SeedOutcome]) -> String {
    let mut out = String::new();
    for o in outcomes {
        let _ = match &o.result {
            Ok(SeedAction::Created) => writeln!(out, "✅ Created user: {}", o.email),
            Ok(SeedAction::Updated) => writeln!(out, "✅ Updated user: {}", o.email),
            Err(e) => writeln!(out, "❌ Error with {}: {e}", o.email),
        };
    }
    out
}

pub fn listing(listing: &UserListing) -> String {
    let mut out = String::new();
    if listing.users.is_empty() {
        let _ = writeln!(out, "No users found in the database.");
    }
    for user in &listing.users {
        let created = user
            .created_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| user.created_at.to_string());
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "Name: {}", if user.name.is_empty() { "N/A" } else { user.name.as_str() });
        let _ = writeln!(out, "Email: {}", user.email);
        let _ = writeln!(out, "Admin: {}", yes_no(user.is_admin));
        let _ = writeln!(out, "Created: {created}");
        let _ = writeln!(out, "ID: {}", user.id);
        let _ = writeln!(out, "Has Password: {}", yes_no(user.password_hash.is_some()));
    }
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Total Users: {}", listing.tally.total);
    let _ = writeln!(out, "Admin Users: {}", listing.tally.admins);
    let _ = writeln!(out, "Regular Users: {}", listing.tally.regular);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::dto::{Branch, UserTally};
    use crate::users::User;
    use time::macros::datetime;
    use uuid::Uuid;

    fn user(hash: Option<&str>) -> User {
        User {
            id: Uuid::nil(),
            email: "prabhakar@gmail.com".into(),
            name: "Prabhakar".into(),
            password_hash: hash.map(str::to_string),
            is_admin: true,
            created_at: datetime!(2025-01-04 10:15:30 UTC),
        }
    }

    #[test]
    fn listing_never_prints_hashes() {
        let users = vec![user(Some("$argon2id$v=19$secret"))];
        let tally = UserTally::of(&users);
        let text = listing(&UserListing { users, tally });
        assert!(text.contains("Has Password: Yes"));
        assert!(text.contains("Created: 2025-01-04T10:15:30Z"));
        assert!(text.contains("Admin Users: 1"));
        assert!(!text.contains("argon2id"));
    }

    #[test]
    fn empty_listing() {
        let text = listing(&UserListing {
            users: vec![],
            tally: UserTally::default(),
        });
        assert!(text.starts_with("No users found"));
        assert!(text.contains("Total Users: 0"));
    }

    #[test]
    fn reconcile_names_branch_and_legacy() {
        let text = reconcile(&ReconcileReport {
            branch: Branch::MigratedLegacy,
            user: user(None),
            removed_legacy: Some("admin123@gmail.com".into()),
        });
        assert!(text.contains("migrated legacy admin: prabhakar@gmail.com"));
        assert!(text.contains("admin123@gmail.com no longer present"));
    }
}
