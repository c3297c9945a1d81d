//! Candidate locator lists
//!
//! Every list is ordered: the locator resolver takes the first entry that
//! matches. Entries cover the current catalog markup first and older layouts
//! after it.

// ===== Top-level menu =====

pub const CATEGORY_LINKS: &str = "a.icons_fa.parent.rounded2.bordered";
pub const CATEGORY_NAME: &[&str] = &["span.name"];
/// Class carried by the dropdown that follows each category link
pub const SUBCATEGORY_DROPDOWN_CLASS: &str = "dropdown";
pub const SUBCATEGORY_LINKS: &str = "a.section.option-font-bold";

// ===== Classification probes =====

pub const SUBCATEGORY_INDEX: &[&str] = &["div.sections_wrapper.block"];

pub const DETAIL_INDICATORS: &[&str] = &[
    ".product-detail-gallery__container",
    ".product-main",
    ".product-info",
    "h1[itemprop='name']",
];

/// Indicators checked by the list extractor before iterating items
pub const DETAIL_REDISPATCH_INDICATORS: &[&str] = &[
    ".product-detail-gallery__container",
    ".product-main",
    ".product-info",
    "div[class*='product-detail']",
];

pub const PRODUCT_LIST_PROBES: &[&str] = &[
    "div.display_list.custom_list.show_un_props",
    "div.list_item.item_info.catalog-adaptive.flexbox.flexbox--row",
    ".list_item.item_info.catalog-adaptive, .list_item_wrapp",
];

// ===== Navigation =====

pub const GRANDCHILD_LINKS: &[&str] = &["a.item_block_href"];
pub const GRANDCHILD_NAME: &[&str] = &["span.font_md"];

pub const NESTED_SECTION_LINKS: &[&str] = &[
    ".catalog_section_list.count_section_list_6.row.items.margin0.flexbox.type_sections_4 a",
    ".catalog_section_list a.item_block_href",
    ".count_section_list_6 a",
    ".type_sections_4 a.item_block_href",
    ".catalog_section_list a",
];
pub const NESTED_SECTION_NAME: &[&str] = &["span.font_md", ".section_name", "span", ".name"];

// ===== Product list items =====

pub const LIST_ITEMS: &[&str] = &[
    "div.list_item.item_info.catalog-adaptive.flexbox.flexbox--row",
    "div.list_item_wrapp.item_wrapp.item.item-parent.clearfix",
    "div.list_item_info.catalog-adaptive.flexbox",
    ".list_item.item_info.catalog-adaptive",
    ".list_item_wrapp",
    "div.list_item",
    "a.thumb",
    ".catalog-adaptive",
];

pub const ITEM_LINK: &[&str] = &[
    "a.dark_link.js-notice-block__title",
    ".list_item_wrap a[href*='/catalog/']",
    ".list_item_info a[href*='/catalog/']",
    "a[href*='/catalog/']",
    "a.product-link",
    "a",
];
pub const ITEM_LINK_NAME: &[&str] = &["span.font_md", "span", ".js-notice-block__title span"];

/// Lazy-loaded gallery spans carrying the picture in `data-src`
pub const ITEM_IMAGE_LAZY: &[&str] = &[
    "span.section-gallery-wrapper__item",
    ".section-gallery-wrapper span[data-src]",
    "span[data-src*='.jpg']",
    "span[data-src*='.png']",
    "span[data-src*='.jpeg']",
];
pub const ITEM_IMAGE: &[&str] = &[
    ".image_block img",
    ".list_item_wrap .image_block img",
    ".section-gallery-wrapper.flexbox img",
    "div.section-gallery-wrapper img",
    ".section-gallery-wrapper img",
    ".item_info img",
    "img",
];

pub const ITEM_PRICE: &[&str] = &[
    ".price_matrix_wrapper .price",
    ".cost.price.clearfix",
    ".information_wrap .cost.price",
    "span.values_wrapper",
    "span.price_measure",
    ".price.font-bold.font_mxs",
    ".values_wrapper",
    ".price_measure",
    ".price",
    "[data-currency]",
    "[data-value*='RUB']",
];
pub const ITEM_PREORDER: &[&str] = &[
    ".preorder_button",
    "[data-name*='preorder']",
    ".btn-default[href*='order']",
    ".to-order",
];

// ===== Single product page =====

pub const DETAIL_TITLE: &[&str] = &[
    "h1.product-main__title",
    "h1[itemprop='name']",
    ".product-main h1",
    ".product-info h1",
    "h1",
];
pub const DETAIL_GALLERY_LINKS: &[&str] = &[
    ".product-detail-gallery__container--vertical link[href]",
    ".product-detail-gallery__container link[href]",
    ".product-detail-gallery__container a[href*='.jpg']",
    ".product-detail-gallery__container a[href*='.png']",
    ".product-detail-gallery__container a[href*='.jpeg']",
    ".product-detail-gallery__container a.fancy.popup_link",
    ".product-detail-gallery__container .fancy[href]",
];
pub const DETAIL_GALLERY_IMAGES: &[&str] = &[
    ".product-detail-gallery__container img[src]",
    ".product-detail-gallery__container img[data-src]",
    ".product-detail-gallery img",
];
pub const DETAIL_PRICE: &[&str] = &[
    ".price.font-bold.font_mxs",
    ".price.font-bold",
    ".price_detail",
    ".cost.font-bold",
    "[data-currency='RUB']",
    ".price",
];
pub const DETAIL_PREORDER: &[&str] = &[
    ".preorder_button",
    "[data-name*='preorder']",
    ".btn-default[href*='order']",
    ".to-order",
    ".btn[href*='order']",
    ".order-button",
];
pub const CHARACTERISTIC_ROWS: &str = ".characteristics table tr";

/// File extensions accepted for gallery links
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif"];

// ===== Tables =====

pub const FULL_LIST_LINK: &[&str] = &["div.module-pagination a.link"];

pub const TABLE_HEADERS: &[&str] = &[
    "tr.table-view__item-wrapper--head th",
    "thead tr th",
    "tr:first-child th",
    ".table-view__item-wrapper--head th",
    "div.razdel.table_all tr:first-child th",
    "table tr:first-child th",
    "th",
];

pub const TABLE_ROWS: &str = "tr.main_item_wrapper";
pub const ROW_ARTICLE_LINK: &[&str] = &["a.dark_link.js-notice-block__title"];
pub const ROW_ARTICLE_TEXT: &[&str] = &["span"];
pub const ROW_NAME: &[&str] = &["span.font_md"];
pub const ROW_PROPS: &str = "td.table-view__item-wrapper-prop";
pub const ROW_IMAGE: &[&str] = &[
    "div.section_img img",
    ".section_img img",
    "img.preview_picture",
    ".preview_picture",
    "td img",
    "img",
];

/// Columns preceding the property cells (article, name)
pub const LEADING_COLUMNS: usize = 2;

// ===== Blocks =====

pub const BLOCKS: &[&str] = &[
    "div.razdel.table_all",
    "div.section_info_wrapper",
    "div.item_block_href",
];
pub const BLOCK_TITLE_BEFORE: &[&str] = &["h1", "h2", "h3", ".section_title", "span.font_md", ".title"];
pub const BLOCK_TITLE_INSIDE: &[&str] = &[
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    ".section_title",
    "span.font_md",
    ".title",
    ".item_name",
];
pub const BLOCK_IMAGE_LINKS: &[&str] = &[
    "div.section_img a.fancy.popup_link",
    ".section_img a.fancy.popup_link",
    ".section_img a[href*='.jpg']",
    ".section_img a[href*='.png']",
    ".section_img a[href*='.gif']",
    "a.fancy.popup_link",
];
pub const BLOCK_IMAGE: &[&str] = &["div.section_img img", ".section_img img", "img"];
pub const BLOCK_HEADERS: &str = "table th";

/// Probes used when a block page shows no blocks at all
pub const BLOCKLESS_DETAIL_INDICATORS: &[&str] = &[
    ".product-detail-gallery__container",
    ".product-main",
    ".product-info",
    "div[class*='product-detail']",
    "h1[itemprop='name']",
];
pub const BLOCKLESS_LIST_ITEMS: &[&str] = &["div.list_item.item_info.catalog-adaptive"];
pub const SINGLE_PRODUCT_BLOCK_TITLE: &str = "Single product";
