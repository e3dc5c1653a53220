pub fn clean_name(name: &str) -> String {
    let without_instance = match name.rsplit_once('_') {
        Some((base, suffix))
            if !suffix.is_empty() && suffix.chars().all(|character| character.is_ascii_digit()) =>
        {
            base
        }
        _ => name,
    };

    without_instance.replace('_', " ")
}

pub fn is_same_player(name: &str, identity: &str) -> bool {
    let normalize = |value: &str| value.trim().replace(' ', "_");
    normalize(name).eq_ignore_ascii_case(&normalize(identity))
}
