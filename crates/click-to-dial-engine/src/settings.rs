use std::time::Duration;

/// Tunables of one engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Quiet period after the last observed change before parked nodes are processed.
    pub quiet_period: Duration,
    /// Parked batches larger than this are dropped instead of processed.
    pub max_parked_nodes: usize,
    /// Number of parked nodes handled per deferred task.
    pub chunk_size: usize,
    /// Subtrees with more elements than this are not scanned.
    pub max_scan_elements: usize,
    /// Also park text nodes whose data changed in place.
    pub watch_character_data: bool,
    /// Background image of the dial icon.
    pub icon_image_url: String,
    /// Stylesheet injected with `media="print"` while the engine runs.
    pub print_stylesheet_href: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_millis(500),
            max_parked_nodes: 150,
            chunk_size: 40,
            max_scan_elements: 2000,
            watch_character_data: false,
            icon_image_url: "img/clicktodial.png".to_string(),
            print_stylesheet_href: "css/print.css".to_string(),
        }
    }
}
