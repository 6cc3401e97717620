pub mod apply;
pub mod mail_body;
pub mod send_mail;
