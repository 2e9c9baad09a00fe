use std::process::Command;

use levy_server::role::Role;
use levy_server::session::SessionKey;

#[test]
fn issue_token_prints_only_the_token() {
    let output = Command::new(env!("CARGO_BIN_EXE_levyd"))
        .args(["issue-token", "--user-id", "u-42", "--role", "LGA_AGENT", "--ttl", "1h"])
        .env("LEVY_SESSION_SECRET", "cli-secret")
        .env("LEVY_LOG_LEVEL", "debug")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1, "stdout was {stdout:?}");

    let claims = SessionKey::new(b"cli-secret".to_vec())
        .verify(lines[0], levy_server::now())
        .unwrap();
    assert_eq!(claims.user_id, "u-42");
    assert_eq!(claims.role, Role::LgaAgent);
    assert!(String::from_utf8_lossy(&output.stderr).contains("issued session token"));
}
