use chorus_model::User;

/// Users with positive wealth, richest first
pub fn top_contributors(users: &[User], count: usize) -> Vec<&User> {
    let mut ranked: Vec<&User> = users.iter().filter(|user| user.wealth > 0).collect();
    ranked.sort_by(|a, b| b.wealth.cmp(&a.wealth));
    ranked.truncate(count);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, wealth: i64) -> User {
        User {
            id: id.to_string(),
            wealth,
            ..Default::default()
        }
    }

    #[test]
    fn test_top_contributors() {
        let users = vec![user("a", 5), user("b", 0), user("c", 50), user("d", 20)];
        let ids: Vec<&str> = top_contributors(&users, 2)
            .iter()
            .map(|u| u.id.as_str())
            .collect();

        assert_eq!(ids, vec!["c", "d"]);
    }

    #[test]
    fn test_no_contributors() {
        assert!(top_contributors(&[user("a", 0)], 10).is_empty());
    }
}
