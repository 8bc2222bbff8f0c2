//! Bearer-token authentication

use aws_lambda_events::lambda_function_urls::LambdaFunctionUrlRequest;

use exitflow_cloud::ENV_AUTH_TOKEN;

/// Check the Authorization header against the deployed token.
pub fn validate(request: &LambdaFunctionUrlRequest) -> Result<(), String> {
    let expected =
        std::env::var(ENV_AUTH_TOKEN).map_err(|_| format!("{ENV_AUTH_TOKEN} not configured"))?;
    if expected.is_empty() {
        return Err(format!("{ENV_AUTH_TOKEN} not configured"));
    }

    let header = request
        .headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| "missing Authorization header".to_string())?;

    // Accept "Bearer <token>" or a bare token.
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .unwrap_or(header)
        .trim();

    if constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err("invalid token".to_string())
    }
}

/// Length-guarded constant-time comparison so the check leaks nothing
/// about how much of the token matched.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_match() {
        assert!(constant_time_eq(b"secret-token", b"secret-token"));
    }

    #[test]
    fn different_inputs_do_not() {
        assert!(!constant_time_eq(b"secret-token", b"secret-tokex"));
        assert!(!constant_time_eq(b"short", b"longer-value"));
        assert!(!constant_time_eq(b"", b"x"));
    }
}
