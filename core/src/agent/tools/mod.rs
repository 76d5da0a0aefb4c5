pub mod dataset;
pub mod execute_code;
pub mod web_search;

pub use dataset::FetchDatasetTool;
pub use execute_code::ExecutePythonTool;
pub use web_search::WebSearchTool;
