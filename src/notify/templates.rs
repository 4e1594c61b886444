//! Message bodies for verification codes and password reset links.

pub const VERIFICATION_SUBJECT: &str = "Your Verification Code";
pub const RESET_SUBJECT: &str = "Reset Your Password";

pub fn verification_email(code: &str, ttl_minutes: i64) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; border: 1px solid #ddd; border-radius: 8px; background-color: #f9f9f9;">
  <h2 style="color: #4CAF50; text-align: center;">Verification Code</h2>
  <p>Dear User,</p>
  <p>Your verification code is:</p>
  <div style="text-align: center; margin: 20px 0;">
    <span style="display: inline-block; font-size: 24px; font-weight: bold; color: #4CAF50; padding: 10px 20px; border: 1px solid #4CAF50; border-radius: 5px; background-color: #e8f5e9;">{code}</span>
  </div>
  <p>Please use this code to verify your email address. The code will expire in {ttl_minutes} minutes.</p>
  <footer style="margin-top: 20px; text-align: center; font-size: 12px; color: #aaa;">
    <p>Thank you,<br>The Marketplace Team</p>
  </footer>
</div>"#
    )
}

pub fn verification_sms(code: &str) -> String {
    format!("Your verification code is: {code}")
}

pub fn reset_url(frontend_url: &str, token: &str) -> String {
    format!("{}/password/reset/{}", frontend_url.trim_end_matches('/'), token)
}

pub fn reset_email(url: &str) -> String {
    format!(
        r#"<p>Your Reset Password Token is:</p>
<p><a href="{url}">{url}</a></p>
<p>If you did not request this, please ignore.</p>"#
    )
}
