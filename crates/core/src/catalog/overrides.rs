//! Curated entries layered over the vendor catalog. They fill gaps the family rules
//! depend on and pin the most common household phrasings to one item.

use crate::catalog::CatalogItem;

struct OverrideItem {
    id: &'static str,
    name: &'static str,
    category: &'static str,
    volume_cuft: f64,
    weight_lbs: f64,
    aliases: &'static [&'static str],
}

const OVERRIDE_ITEMS: &[OverrideItem] = &[
    OverrideItem {
        id: "refrigerator_standard",
        name: "Refrigerator",
        category: "appliance",
        volume_cuft: 45.0,
        weight_lbs: 250.0,
        aliases: &["refrigerator", "fridge", "refrigerator standard"],
    },
    OverrideItem {
        id: "sofa_three_seat",
        name: "Sofa",
        category: "sofa",
        volume_cuft: 65.0,
        weight_lbs: 210.0,
        aliases: &["sofa", "couch", "sofa couch"],
    },
    OverrideItem {
        id: "wardrobe_large",
        name: "Wardrobe",
        category: "wardrobe",
        volume_cuft: 45.0,
        weight_lbs: 240.0,
        aliases: &["wardrobe", "armoire", "armoire wardrobe"],
    },
    OverrideItem {
        id: "safe_large",
        name: "Safe",
        category: "safe",
        volume_cuft: 18.0,
        weight_lbs: 320.0,
        aliases: &["safe", "gun safe", "floor safe"],
    },
    OverrideItem {
        id: "dresser_standard",
        name: "Dresser",
        category: "dresser",
        volume_cuft: 35.0,
        weight_lbs: 150.0,
        aliases: &["dresser", "bureau"],
    },
    OverrideItem {
        id: "dresser_tall",
        name: "Dresser Tall",
        category: "dresser",
        volume_cuft: 32.0,
        weight_lbs: 165.0,
        aliases: &["tall dresser", "highboy", "chest of drawers"],
    },
    OverrideItem {
        id: "dresser_double",
        name: "Dresser Double",
        category: "dresser",
        volume_cuft: 45.0,
        weight_lbs: 190.0,
        aliases: &["double dresser", "lowboy dresser"],
    },
    OverrideItem {
        id: "rug_large",
        name: "Rug Large",
        category: "rug",
        volume_cuft: 10.0,
        weight_lbs: 50.0,
        aliases: &["large rug", "rug large"],
    },
    OverrideItem {
        id: "carton_box_small_1_5",
        name: "Box Small 1.5 cu ft",
        category: "carton",
        volume_cuft: 1.5,
        weight_lbs: 35.0,
        aliases: &["1.5 box", "small box", "box 1.5", "1.5 cu ft box"],
    },
    OverrideItem {
        id: "carton_box_medium_3_0",
        name: "Box Medium 3.0 cu ft",
        category: "carton",
        volume_cuft: 3.0,
        weight_lbs: 50.0,
        aliases: &["3.0 box", "medium box", "box 3.0", "3.0 cu ft box"],
    },
    OverrideItem {
        id: "carton_box_large_4_5",
        name: "Box Large 4.5 cu ft",
        category: "carton",
        volume_cuft: 4.5,
        weight_lbs: 65.0,
        aliases: &["4.5 box", "large box", "box 4.5", "4.5 cu ft box"],
    },
    OverrideItem {
        id: "carton_box_xl_6_0",
        name: "Box XL 6.0 cu ft",
        category: "carton",
        volume_cuft: 6.0,
        weight_lbs: 80.0,
        aliases: &["6.0 box", "xl box", "extra large box", "box 6.0"],
    },
];

/// Phrase to item id, registered at canonical priority.
pub(crate) const MANUAL_ALIASES: &[(&str, &str)] = &[
    ("dining table", "dining_table_medium"),
    ("table dining", "dining_table_medium"),
    ("dining table medium", "dining_table_medium"),
    ("refrigerator", "refrigerator_standard"),
    ("fridge", "refrigerator_standard"),
    ("couch", "sofa_three_seat"),
    ("sofa", "sofa_three_seat"),
    ("wardrobe", "wardrobe_large"),
    ("safe", "safe_large"),
    ("bureau", "dresser_standard"),
    ("dresser", "dresser_standard"),
];

pub(crate) fn override_items() -> impl Iterator<Item = CatalogItem> {
    OVERRIDE_ITEMS.iter().map(|item| CatalogItem {
        id: item.id.to_string(),
        name: item.name.to_string(),
        category: item.category.to_string(),
        volume_cuft: item.volume_cuft,
        weight_lbs: item.weight_lbs,
        aliases: item.aliases.iter().map(|alias| (*alias).to_string()).collect(),
    })
}
