//! Reviewer selection.
//!
//! Pure functions over a team roster. The roster order decides who is picked,
//! so the same roster and inputs always give the same result.

use crate::models::User;

/// Number of reviewers assigned to a new pull request.
pub const MAX_REVIEWERS: usize = 2;

/// Pick up to `max_count` active roster members other than the author.
///
/// Returns fewer ids (possibly none) when the roster runs out.
pub fn select_reviewers(author_id: &str, roster: &[User], max_count: usize) -> Vec<String> {
    let mut picked: Vec<String> = Vec::with_capacity(max_count);

    for member in roster {
        if picked.len() >= max_count {
            break;
        }
        if member.user_id == author_id || !member.is_active {
            continue;
        }
        if picked.iter().any(|id| *id == member.user_id) {
            continue;
        }
        picked.push(member.user_id.clone());
    }

    picked
}

/// Pick the first active roster member who is neither the author nor a
/// current reviewer.
pub fn select_replacement(
    author_id: &str,
    current_reviewers: &[String],
    roster: &[User],
) -> Option<String> {
    roster
        .iter()
        .filter(|member| member.user_id != author_id && member.is_active)
        .find(|member| !current_reviewers.contains(&member.user_id))
        .map(|member| member.user_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, active: bool) -> User {
        User {
            user_id: id.to_string(),
            username: id.to_string(),
            team_name: Some("backend".to_string()),
            is_active: active,
        }
    }

    #[test]
    fn test_select_reviewers_skips_author_and_inactive() {
        let roster = vec![
            member("u1", true),
            member("u2", false),
            member("u3", true),
            member("u4", true),
            member("u5", true),
        ];

        assert_eq!(
            select_reviewers("u1", &roster, MAX_REVIEWERS),
            vec!["u3", "u4"]
        );
    }

    #[test]
    fn test_select_reviewers_short_roster() {
        let roster = vec![member("u1", true), member("u2", true)];
        assert_eq!(select_reviewers("u1", &roster, MAX_REVIEWERS), vec!["u2"]);

        let solo = vec![member("u1", true)];
        assert!(select_reviewers("u1", &solo, MAX_REVIEWERS).is_empty());
        assert!(select_reviewers("u1", &[], MAX_REVIEWERS).is_empty());
    }

    #[test]
    fn test_select_reviewers_never_repeats() {
        let roster = vec![member("u2", true), member("u2", true), member("u3", true)];
        assert_eq!(select_reviewers("u1", &roster, 3), vec!["u2", "u3"]);
    }

    #[test]
    fn test_select_reviewers_zero_count() {
        let roster = vec![member("u2", true)];
        assert!(select_reviewers("u1", &roster, 0).is_empty());
    }

    #[test]
    fn test_select_replacement_excludes_current_reviewers() {
        let roster = vec![
            member("u1", true),
            member("u2", true),
            member("u3", true),
            member("u4", false),
            member("u5", true),
        ];
        let current = vec!["u2".to_string(), "u3".to_string()];

        assert_eq!(
            select_replacement("u1", &current, &roster),
            Some("u5".to_string())
        );
    }

    #[test]
    fn test_select_replacement_none() {
        let roster = vec![member("u1", true), member("u2", true)];
        let current = vec!["u2".to_string()];

        assert_eq!(select_replacement("u1", &current, &roster), None);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let roster: Vec<User> = (1..=6).map(|i| member(&format!("u{}", i), true)).collect();

        let first = select_reviewers("u3", &roster, MAX_REVIEWERS);
        for _ in 0..10 {
            assert_eq!(select_reviewers("u3", &roster, MAX_REVIEWERS), first);
        }
    }
}
