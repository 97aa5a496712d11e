//! Class Rule Resolver
//!
//! Collects the declarations of every top-level style rule whose selector
//! text is exactly `.<class>` for one of an element's classes.

use domwatch_css::{parse_declarations, CssRule, DeclarationMap, StyleSheetList};
use domwatch_dom::{DomTree, NodeId};

/// Selector text matched for a class name
pub fn class_selector(class: &str) -> String {
    format!(".{}", class)
}

/// Merge the declarations of all rules targeting the element's classes.
///
/// Classes are visited in class-list order; for each class every sheet is
/// scanned in order, and every matching rule in a sheet is merged in rule
/// order, later matches overwriting earlier ones. Sheets whose rules
/// cannot be read are skipped. Unknown ids and non-elements produce an
/// empty map.
pub fn applied_class_rules(tree: &DomTree, sheets: &StyleSheetList, element: NodeId) -> DeclarationMap {
    let mut result = DeclarationMap::new();

    let Some(elem) = tree.get(element).and_then(|n| n.as_element()) else {
        return result;
    };

    for class in elem.class_list() {
        let selector = class_selector(class);

        for sheet in sheets.iter() {
            let rules = match sheet.css_rules() {
                Ok(rules) => rules,
                Err(e) => {
                    log::debug!("Skipping stylesheet: {}", e);
                    continue;
                }
            };

            for rule in rules {
                if let CssRule::Style(style) = rule {
                    if style.selector_text == selector {
                        result.merge(parse_declarations(&style.css_text));
                    }
                }
            }
        }
    }

    result
}
