//! Element locators, frame names and page titles of the library login flow
//! and the WiseNews portal.

use crate::browser::Locator;

// Library home page and identity provider.
pub const LIBRARY_TITLE: &str = "HKU Libraries";
pub const LIBRARY_NOTICE_CLOSE: Locator<'static> = Locator::XPath(r#"//*[@id="popup_this"]/span"#);
pub const LIBRARY_LOGIN_BUTTON: Locator<'static> = Locator::XPath(r#"//*[@class="button green"]"#);
pub const IDP_TITLE: &str = "HKUL Authentication";
pub const IDP_USER_ID: Locator<'static> = Locator::Name("userid");
pub const IDP_PASSWORD: Locator<'static> = Locator::Name("password");
pub const IDP_SUBMIT: Locator<'static> =
    Locator::XPath("/html/body/main/div/form/div/div/div[3]/button[1]");
pub const IDP_MENU: Locator<'static> = Locator::XPath(r#"//*[@class="menu-arrow"]"#);
pub const IDP_SIGN_OUT: Locator<'static> = Locator::Id("signOutButton");

// Portal entry.
pub const WISENEWS_TITLE: &str = "WiseNews";
pub const PORTAL_TITLE: &str = "Wisers Information Portal";
pub const HEADER_FRAME: &str = "header";
pub const PORTAL_LINK: Locator<'static> = Locator::LinkText("Wisers Information Portal");
pub const LOGOUT_LINK: Locator<'static> = Locator::LinkText("Logout");

// Search form.
pub const CONTENT_FRAME: &str = "ws5-content";
pub const RESULTS_FRAME: &str = "result-list";
pub const ALERT_LAYER_CLOSE: Locator<'static> =
    Locator::XPath(r#"//*[@id="popup_alert_layer"]/div[3]/a"#);
pub const REGION_SELECT_ALL: Locator<'static> = Locator::Id("regionSelectAll");
pub const SECTION_FIELD: Locator<'static> = Locator::Id("ShowSection");
pub const DATE_RANGE_DROPDOWN: Locator<'static> = Locator::Id("DateRangePeriod");
pub const SEARCH_TEXT: Locator<'static> = Locator::Id("searchTxt");
pub const EDIT_SEARCH: Locator<'static> = Locator::Id("edit_search");

// Results list toolbar and popups.
pub const VIEW_BUTTON: Locator<'static> = Locator::Id("Imageview");
pub const VIEW_ALL_BUTTON: Locator<'static> =
    Locator::XPath(r#"//*[@id="ToolForm"]/table/tbody/tr[3]/td/input"#);
pub const EMAIL_BUTTON: Locator<'static> = Locator::Id("Imageemail");
pub const MAIL_SENDER_NAME: Locator<'static> =
    Locator::XPath(r#"//*[@id="ToolForm"]/table[1]/tbody/tr[6]/td[2]/input"#);
pub const MAIL_SENDER_ADDRESS: Locator<'static> =
    Locator::XPath(r#"//*[@id="sender-address-id"]/td[2]/table/tbody/tr/td[1]/input"#);
pub const MAIL_RECIPIENT: Locator<'static> = Locator::Id("email-addr");
pub const MAIL_SUBJECT: Locator<'static> =
    Locator::XPath(r#"//*[@id="ToolForm"]/table[1]/tbody/tr[9]/td[2]/input"#);
pub const MAIL_SEND: Locator<'static> = Locator::XPath(r#"//*[@id="emailContent"]/input"#);

// Article viewer. XPath for the live page, CSS for saved captures.
pub const HEADINGS: Locator<'static> = Locator::XPath(r#"//*[@class="bluebold"]"#);
pub const BODIES: Locator<'static> = Locator::XPath(r#"//*[@class="content"]"#);
pub const SOURCES: Locator<'static> = Locator::XPath(r#"//*[@id="content_source"]/a"#);
pub const DETAILS: Locator<'static> = Locator::XPath(r#"//*[@id="content_details"]"#);

pub const HEADINGS_CSS: &str = r#"[class="bluebold"]"#;
pub const BODIES_CSS: &str = r#"[class="content"]"#;
pub const SOURCES_CSS: &str = r#"[id="content_source"] > a"#;
pub const DETAILS_CSS: &str = r#"[id="content_details"]"#;
