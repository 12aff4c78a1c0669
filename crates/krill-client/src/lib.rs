pub mod browser;
pub mod scrapers;

pub use browser::{BrowserSettings, ChromeBrowser, ChromeSession};
pub use scrapers::{BoardSelectors, GreenhouseScraper, SelectorScraper, registry};
