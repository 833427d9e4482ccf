pub mod html;
pub mod ssrf;
pub mod url;
