pub mod pipelines;
pub mod url_check;
