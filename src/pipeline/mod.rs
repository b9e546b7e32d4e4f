pub mod allocation; // Three-tier strategic allocation extractor
pub mod inference; // Remote providers with failover
pub mod navigation; // Page fetch and HTML section readers
