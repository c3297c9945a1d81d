use crate::url::canonical_key;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name given to products whose page shows no usable name
pub const UNNAMED_PRODUCT: &str = "Unnamed product";

/// One normalized product record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub article: Option<String>,
    /// Price text, or the preorder label when `is_preorder` is set
    pub price: Option<String>,
    pub is_preorder: bool,
    /// Column name to cell value, in source column order
    pub attributes: IndexMap<String, String>,
}

impl Product {
    /// Creates a product, substituting the placeholder for a blank name
    pub fn named(name: &str) -> Self {
        let name = name.trim();
        Self {
            name: if name.is_empty() {
                UNNAMED_PRODUCT.to_string()
            } else {
                name.to_string()
            },
            url: None,
            image_url: None,
            article: None,
            price: None,
            is_preorder: false,
            attributes: IndexMap::new(),
        }
    }

    /// Stores an attribute; a repeated key keeps its first position and takes the new value
    pub fn set_attribute(&mut self, key: &str, value: &str) {
        self.attributes.insert(key.to_string(), value.to_string());
    }
}

/// A titled sub-table with its own column schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductBlock {
    pub title: String,
    pub image_url: Option<String>,
    pub column_headers: Vec<String>,
    pub products: Vec<Product>,
}

/// A navigable child link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    pub name: String,
    pub url: String,
}

/// Structural shape of a rendered page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageKind {
    SubcategoryIndex,
    SingleProductDetail,
    ProductList,
    ProductTable,
    BlockStructuredTable,
}

impl PageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubcategoryIndex => "subcategory_index",
            Self::SingleProductDetail => "single_product_detail",
            Self::ProductList => "product_list",
            Self::ProductTable => "product_table",
            Self::BlockStructuredTable => "block_structured_table",
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What an extractor produced for one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PagePayload {
    Links(Vec<NavLink>),
    Products {
        kind: PageKind,
        headers: Vec<String>,
        products: Vec<Product>,
    },
    Blocks(Vec<ProductBlock>),
    Empty,
}

impl PagePayload {
    /// True when the page yielded nothing worth keeping
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Links(links) => links.is_empty(),
            Self::Products { products, .. } => products.is_empty(),
            Self::Blocks(blocks) => blocks.is_empty(),
            Self::Empty => true,
        }
    }

    /// Number of products carried, including those inside blocks
    pub fn product_count(&self) -> usize {
        match self {
            Self::Products { products, .. } => products.len(),
            Self::Blocks(blocks) => blocks.iter().map(|b| b.products.len()).sum(),
            Self::Links(_) | Self::Empty => 0,
        }
    }
}

/// One node of the catalog tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub name: String,
    pub url: String,
    pub children: Vec<CategoryNode>,
    pub products: Vec<Product>,
    pub blocks: Vec<ProductBlock>,
    pub column_headers: Vec<String>,
}

impl CategoryNode {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            children: Vec::new(),
            products: Vec::new(),
            blocks: Vec::new(),
            column_headers: Vec::new(),
        }
    }

    pub fn from_link(link: &NavLink) -> Self {
        Self::new(&link.name, &link.url)
    }

    /// Identity of the node across runs: its canonical URL
    pub fn key(&self) -> String {
        canonical_key(&self.url).unwrap_or_else(|_| self.url.clone())
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Products in this node and every descendant
    pub fn total_products(&self) -> usize {
        self.products.len()
            + self
                .children
                .iter()
                .map(CategoryNode::total_products)
                .sum::<usize>()
    }

    /// Number of levels in this subtree, counting the node itself
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(CategoryNode::depth)
            .max()
            .unwrap_or(0)
    }

    /// Number of nodes in this subtree, counting the node itself
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(CategoryNode::node_count).sum::<usize>()
    }

    /// Resolves this node as a leaf holding a flat product list
    pub fn attach_products(&mut self, headers: Vec<String>, products: Vec<Product>) {
        self.column_headers = headers;
        self.products = products;
    }

    /// Resolves this node as a leaf holding blocks
    ///
    /// `products` receives the products of all blocks in block order.
    pub fn attach_blocks(&mut self, blocks: Vec<ProductBlock>) {
        self.products = blocks
            .iter()
            .flat_map(|block| block.products.iter().cloned())
            .collect();
        self.blocks = blocks;
    }
}

/// Durable snapshot of crawl progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlCheckpoint {
    /// Names from the top-level category down to the last visited node
    pub visited_path: Vec<String>,
    pub last_successful_url: Option<String>,
    pub processed_count: u64,
    pub started_at: DateTime<Utc>,
}

impl CrawlCheckpoint {
    pub fn new() -> Self {
        Self {
            visited_path: Vec::new(),
            last_successful_url: None,
            processed_count: 0,
            started_at: Utc::now(),
        }
    }
}

impl Default for CrawlCheckpoint {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str) -> Product {
        Product::named(name)
    }

    #[test]
    fn test_blank_name_uses_placeholder() {
        assert_eq!(Product::named("   ").name, UNNAMED_PRODUCT);
        assert_eq!(Product::named(" CK6136 ").name, "CK6136");
    }

    #[test]
    fn test_attributes_keep_insertion_order() {
        let mut p = product("x");
        p.set_attribute("Power", "5kW");
        p.set_attribute("Price", "$100");
        p.set_attribute("Power", "7kW");

        let keys: Vec<&str> = p.attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Power", "Price"]);
        assert_eq!(p.attributes["Power"], "7kW");
    }

    #[test]
    fn test_tree_helpers() {
        let mut root = CategoryNode::new("Lathes", "https://shop.test/catalog/lathes/");
        let mut table = CategoryNode::new("CNC", "https://shop.test/catalog/lathes/cnc/");
        table.attach_products(vec!["Article".into()], vec![product("a"), product("b")]);

        let mut blocks = CategoryNode::new("Heavy", "https://shop.test/catalog/lathes/heavy/");
        blocks.attach_blocks(vec![
            ProductBlock {
                title: "Series 1".into(),
                image_url: None,
                column_headers: vec![],
                products: vec![product("c")],
            },
            ProductBlock {
                title: "Series 2".into(),
                image_url: None,
                column_headers: vec![],
                products: vec![product("d"), product("e")],
            },
        ]);
        assert_eq!(blocks.products.len(), 3);

        root.children.push(table);
        root.children.push(blocks);

        assert!(!root.is_leaf());
        assert!(root.products.is_empty());
        assert_eq!(root.total_products(), 5);
        assert_eq!(root.depth(), 2);
        assert_eq!(root.node_count(), 3);
    }

    #[test]
    fn test_key_ignores_name() {
        let a = CategoryNode::new("Unknown category", "https://shop.test/catalog/a/");
        let b = CategoryNode::new("Unknown category", "https://shop.test/catalog/b/");
        let a_again = CategoryNode::new("Renamed", "https://SHOP.test/catalog/a");

        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), a_again.key());
    }

    #[test]
    fn test_payload_emptiness() {
        assert!(PagePayload::Empty.is_empty());
        assert!(PagePayload::Links(vec![]).is_empty());
        assert!(!PagePayload::Products {
            kind: PageKind::ProductList,
            headers: vec![],
            products: vec![product("x")],
        }
        .is_empty());
        assert_eq!(PagePayload::Links(vec![]).product_count(), 0);
    }

    #[test]
    fn test_page_kind_display() {
        assert_eq!(PageKind::BlockStructuredTable.to_string(), "block_structured_table");
    }
}
