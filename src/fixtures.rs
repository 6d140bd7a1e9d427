//! Locators and parameter tables for the JobCafe site.
//!
//! The XPaths are the site's actual markup contract; change them only
//! when the markup changes.

use jobcafe_core_types::Locator;

pub const LOGO: &str = "//img[@src = '/img/site_bg.jpg']";
pub const COMING_SOON: &str = "//img[@alt = 'coming soon']";
pub const JOB_PAGE: &str = "//a[@href ='/job-page']";
pub const ABOUT_PAGE: &str = "//a[@href ='/about']";
pub const SEARCH_BUTTON: &str = "//button[@class ='search-butom']";
pub const POSITION_FIELD: &str = "//input[@placeholder ='position']";
pub const LOCATION_FIELD: &str = "//input[@placeholder ='location']";
pub const COMPANY_FIELD: &str = "//input[@placeholder ='company']";
pub const RESET_BUTTON: &str = "//*[contains(text(), 'reset')]";
pub const ABOUT_LOGO: &str = "//*[contains(text(), 'CAFE')]";
pub const RESULTS_PROBE: &str = "//*[contains(text(), 'found')]";
pub const NO_RESULTS_BANNER: &str = "//*[contains(text(), 'No results found!')]";

pub fn logo() -> Locator {
    Locator::xpath(LOGO)
}

pub fn coming_soon() -> Locator {
    Locator::xpath(COMING_SOON)
}

pub fn job_page_link() -> Locator {
    Locator::xpath(JOB_PAGE)
}

pub fn about_link() -> Locator {
    Locator::xpath(ABOUT_PAGE)
}

pub fn search_button() -> Locator {
    Locator::xpath(SEARCH_BUTTON)
}

pub fn position_field() -> Locator {
    Locator::xpath(POSITION_FIELD)
}

pub fn location_field() -> Locator {
    Locator::xpath(LOCATION_FIELD)
}

pub fn company_field() -> Locator {
    Locator::xpath(COMPANY_FIELD)
}

pub fn reset_button() -> Locator {
    Locator::xpath(RESET_BUTTON)
}

pub fn about_logo() -> Locator {
    Locator::xpath(ABOUT_LOGO)
}

pub fn results_probe() -> Locator {
    Locator::xpath(RESULTS_PROBE)
}

pub fn no_results_banner() -> Locator {
    Locator::xpath(NO_RESULTS_BANNER)
}

/// Inputs for the parameterized search cases.
pub const LOCATION_INPUTS: &[&str] = &["Toronto", "Tel-Aviv", "Chicago", "New-York"];
pub const POSITION_INPUTS: &[&str] = &["QA", "Developer", "Project", "Manager"];
pub const COMPANY_INPUTS: &[&str] = &["Apple", "Facebook", "Google"];
