use rand::Rng;

/// Generates an assessment number, e.g. `AS-7-1a2b3c`. Global
/// uniqueness is enforced by the database; callers retry on collision.
/// Numbers are opaque tokens, never regenerated once assigned.
pub fn generate_assessment_number(school_code: i32) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| {
            let v = rng.gen_range(0..16u8);
            char::from_digit(v as u32, 16).unwrap_or('0')
        })
        .collect();
    format!("AS-{}-{}", school_code, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_matches_expected_shape() {
        let number = generate_assessment_number(7);
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "AS");
        assert_eq!(parts[1], "7");
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(parts[2].chars().all(|c| !c.is_ascii_uppercase()));
    }

    #[test]
    fn consecutive_numbers_differ() {
        // Not a uniqueness guarantee (the database provides that), just a
        // sanity check that the generator is not constant.
        let a = generate_assessment_number(1);
        let b = generate_assessment_number(1);
        let c = generate_assessment_number(1);
        assert!(a != b || b != c);
    }
}
