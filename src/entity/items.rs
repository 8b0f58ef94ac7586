//! Shop items and guest inventory

use serde::{Deserialize, Serialize};

use crate::core::types::Money;
use crate::park::map::LitterKind;

/// Items a guest can carry; discriminants are inventory bit positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ShopItem {
    Balloon = 0,
    Toy = 1,
    Map = 2,
    Photo = 3,
    Umbrella = 4,
    Drink = 5,
    Burger = 6,
    Chips = 7,
    IceCream = 8,
    Candyfloss = 9,
    EmptyCan = 10,
    Rubbish = 11,
    EmptyBurgerBox = 12,
    Pizza = 13,
    Voucher = 14,
    Popcorn = 15,
    HotDog = 16,
    Tentacle = 17,
    Hat = 18,
    ToffeeApple = 19,
    TShirt = 20,
    Doughnut = 21,
    Coffee = 22,
    EmptyCup = 23,
    Chicken = 24,
    Lemonade = 25,
    EmptyBox = 26,
    EmptyBottle = 27,
    Pretzel = 32,
    Chocolate = 33,
    IcedTea = 34,
    FunnelCake = 35,
    Sunglasses = 36,
    BeefNoodles = 37,
    FriedRiceNoodles = 38,
    WontonSoup = 39,
    MeatballSoup = 40,
    FruitJuice = 41,
    SoybeanMilk = 42,
    Sujeonggwa = 43,
    SubSandwich = 44,
    Cookie = 45,
    EmptyBowlRed = 46,
    EmptyDrinkCarton = 47,
    EmptyJuiceCup = 48,
    RoastSausage = 49,
    EmptyBowlBlue = 50,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    Food,
    Drink,
    Souvenir,
    Container,
    Voucher,
}

/// Static economics of one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemDescriptor {
    /// Cost to the park per unit sold
    pub cost: Money,
    pub base_value: Money,
    /// Perceived value at 21 °C and above
    pub hot_value: Money,
    /// Perceived value at 11 °C and below
    pub cold_value: Money,
    pub default_price: Money,
    pub category: ItemCategory,
    /// Slow-update cycles to finish the item, food and drink only
    pub consumption_time: u8,
    pub discard_container: Option<ShopItem>,
    pub litter: LitterKind,
}

const fn item(
    cost: Money,
    base_value: Money,
    hot_value: Money,
    cold_value: Money,
    default_price: Money,
    category: ItemCategory,
    consumption_time: u8,
    discard_container: Option<ShopItem>,
    litter: LitterKind,
) -> ItemDescriptor {
    ItemDescriptor {
        cost,
        base_value,
        hot_value,
        cold_value,
        default_price,
        category,
        consumption_time,
        discard_container,
        litter,
    }
}

const fn container(litter: LitterKind) -> ItemDescriptor {
    item(0, 0, 0, 0, 0, ItemCategory::Container, 0, None, litter)
}

impl ShopItem {
    pub const ALL: [ShopItem; 47] = [
        ShopItem::Balloon,
        ShopItem::Toy,
        ShopItem::Map,
        ShopItem::Photo,
        ShopItem::Umbrella,
        ShopItem::Drink,
        ShopItem::Burger,
        ShopItem::Chips,
        ShopItem::IceCream,
        ShopItem::Candyfloss,
        ShopItem::EmptyCan,
        ShopItem::Rubbish,
        ShopItem::EmptyBurgerBox,
        ShopItem::Pizza,
        ShopItem::Voucher,
        ShopItem::Popcorn,
        ShopItem::HotDog,
        ShopItem::Tentacle,
        ShopItem::Hat,
        ShopItem::ToffeeApple,
        ShopItem::TShirt,
        ShopItem::Doughnut,
        ShopItem::Coffee,
        ShopItem::EmptyCup,
        ShopItem::Chicken,
        ShopItem::Lemonade,
        ShopItem::EmptyBox,
        ShopItem::EmptyBottle,
        ShopItem::Pretzel,
        ShopItem::Chocolate,
        ShopItem::IcedTea,
        ShopItem::FunnelCake,
        ShopItem::Sunglasses,
        ShopItem::BeefNoodles,
        ShopItem::FriedRiceNoodles,
        ShopItem::WontonSoup,
        ShopItem::MeatballSoup,
        ShopItem::FruitJuice,
        ShopItem::SoybeanMilk,
        ShopItem::Sujeonggwa,
        ShopItem::SubSandwich,
        ShopItem::Cookie,
        ShopItem::EmptyBowlRed,
        ShopItem::EmptyDrinkCarton,
        ShopItem::EmptyJuiceCup,
        ShopItem::RoastSausage,
        ShopItem::EmptyBowlBlue,
    ];

    pub fn bit(self) -> u32 {
        self as u32
    }

    pub fn from_bit(bit: u32) -> Option<ShopItem> {
        Self::ALL.iter().copied().find(|item| item.bit() == bit)
    }

    pub fn descriptor(self) -> ItemDescriptor {
        use ItemCategory::{Food, Souvenir};
        use LitterKind as L;
        use ShopItem::*;
        match self {
            Balloon => item(3, 14, 14, 14, 9, Souvenir, 0, None, L::Rubbish),
            Toy => item(15, 30, 30, 30, 25, Souvenir, 0, None, L::Rubbish),
            Map => item(1, 7, 7, 8, 6, Souvenir, 0, None, L::Rubbish),
            Photo => item(2, 30, 30, 30, 0, Souvenir, 0, None, L::Rubbish),
            Umbrella => item(20, 35, 25, 50, 25, Souvenir, 0, None, L::Rubbish),
            Drink => item(3, 12, 20, 10, 12, ItemCategory::Drink, 7, Some(EmptyCan), L::EmptyCan),
            Burger => item(5, 19, 19, 22, 15, Food, 10, Some(EmptyBurgerBox), L::BurgerBox),
            Chips => item(4, 16, 16, 18, 15, Food, 10, Some(Rubbish), L::Rubbish),
            IceCream => item(4, 10, 15, 6, 9, Food, 5, None, L::Rubbish),
            Candyfloss => item(3, 9, 9, 6, 8, Food, 5, None, L::Rubbish),
            EmptyCan => container(L::EmptyCan),
            ShopItem::Rubbish => container(L::Rubbish),
            EmptyBurgerBox => container(L::BurgerBox),
            Pizza => item(6, 21, 21, 25, 16, Food, 12, Some(ShopItem::Rubbish), L::Rubbish),
            ShopItem::Voucher => item(0, 0, 0, 0, 0, ItemCategory::Voucher, 0, None, L::Rubbish),
            Popcorn => item(5, 13, 13, 11, 12, Food, 10, Some(ShopItem::Rubbish), L::Rubbish),
            HotDog => item(5, 17, 17, 20, 10, Food, 10, None, L::Rubbish),
            Tentacle => item(11, 22, 20, 18, 15, Food, 12, None, L::Rubbish),
            Hat => item(9, 27, 32, 24, 15, Souvenir, 0, None, L::Rubbish),
            ToffeeApple => item(4, 10, 10, 10, 7, Food, 7, None, L::Rubbish),
            TShirt => item(20, 37, 37, 37, 30, Souvenir, 0, None, L::Rubbish),
            Doughnut => item(4, 8, 7, 10, 7, Food, 7, None, L::Rubbish),
            Coffee => item(3, 11, 15, 20, 12, ItemCategory::Drink, 7, Some(EmptyCup), L::EmptyCup),
            EmptyCup => container(L::EmptyCup),
            Chicken => item(5, 19, 19, 22, 15, Food, 12, Some(EmptyBox), L::EmptyBox),
            Lemonade => item(4, 11, 21, 10, 12, ItemCategory::Drink, 7, Some(EmptyBottle), L::EmptyBottle),
            EmptyBox => container(L::EmptyBox),
            EmptyBottle => container(L::EmptyBottle),
            Pretzel => item(5, 11, 11, 11, 11, Food, 10, None, L::Rubbish),
            Chocolate => item(4, 13, 13, 20, 12, ItemCategory::Drink, 7, Some(EmptyCup), L::EmptyCup),
            IcedTea => item(3, 10, 20, 10, 11, ItemCategory::Drink, 7, Some(EmptyCup), L::EmptyCup),
            FunnelCake => item(5, 13, 11, 14, 12, Food, 10, None, L::Rubbish),
            Sunglasses => item(8, 15, 20, 12, 15, Souvenir, 0, None, L::Rubbish),
            BeefNoodles => item(7, 17, 17, 20, 15, Food, 12, Some(EmptyBowlRed), L::EmptyBowlRed),
            FriedRiceNoodles => item(6, 17, 17, 20, 15, Food, 12, Some(EmptyBowlRed), L::EmptyBowlRed),
            WontonSoup => item(4, 13, 13, 15, 15, Food, 12, Some(EmptyBowlBlue), L::EmptyBowlBlue),
            MeatballSoup => item(5, 14, 14, 16, 15, Food, 12, Some(EmptyBowlBlue), L::EmptyBowlBlue),
            FruitJuice => item(4, 11, 19, 11, 12, ItemCategory::Drink, 7, Some(EmptyJuiceCup), L::EmptyJuiceCup),
            SoybeanMilk => item(4, 10, 14, 10, 12, ItemCategory::Drink, 7, Some(EmptyDrinkCarton), L::EmptyDrinkCarton),
            Sujeonggwa => item(3, 11, 14, 11, 12, ItemCategory::Drink, 7, Some(EmptyDrinkCarton), L::EmptyDrinkCarton),
            SubSandwich => item(5, 19, 19, 17, 15, Food, 10, None, L::Rubbish),
            Cookie => item(4, 8, 8, 8, 7, Food, 7, None, L::Rubbish),
            EmptyBowlRed => container(L::EmptyBowlRed),
            EmptyDrinkCarton => container(L::EmptyDrinkCarton),
            EmptyJuiceCup => container(L::EmptyJuiceCup),
            RoastSausage => item(5, 16, 16, 20, 15, Food, 10, None, L::Rubbish),
            EmptyBowlBlue => container(L::EmptyBowlBlue),
        }
    }

    pub fn category(self) -> ItemCategory {
        self.descriptor().category
    }

    pub fn is_food(self) -> bool {
        self.category() == ItemCategory::Food
    }

    pub fn is_drink(self) -> bool {
        self.category() == ItemCategory::Drink
    }

    pub fn is_food_or_drink(self) -> bool {
        self.is_food() || self.is_drink()
    }

    pub fn is_souvenir(self) -> bool {
        self.category() == ItemCategory::Souvenir
    }

    pub fn is_container(self) -> bool {
        self.category() == ItemCategory::Container
    }
}

/// Items held, as two 32-bit words (standard and extra items)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Inventory {
    pub standard: u32,
    pub extra: u32,
}

impl Inventory {
    fn bits(&self) -> u64 {
        self.standard as u64 | ((self.extra as u64) << 32)
    }

    fn set_bits(&mut self, bits: u64) {
        self.standard = bits as u32;
        self.extra = (bits >> 32) as u32;
    }

    pub fn has(&self, item: ShopItem) -> bool {
        self.bits() & (1 << item.bit()) != 0
    }

    pub fn give(&mut self, item: ShopItem) {
        self.set_bits(self.bits() | (1 << item.bit()));
    }

    pub fn remove(&mut self, item: ShopItem) {
        self.set_bits(self.bits() & !(1 << item.bit()));
    }

    pub fn is_empty(&self) -> bool {
        self.bits() == 0
    }

    /// Held items in bit order
    pub fn items(&self) -> impl Iterator<Item = ShopItem> + '_ {
        ShopItem::ALL.iter().copied().filter(|item| self.has(*item))
    }

    /// Lowest-bit food or drink being carried
    pub fn food_or_drink(&self) -> Option<ShopItem> {
        self.items().find(|item| item.is_food_or_drink())
    }

    pub fn has_food_or_drink(&self) -> bool {
        self.food_or_drink().is_some()
    }

    pub fn has_drink(&self) -> bool {
        self.items().any(|item| item.is_drink())
    }

    pub fn empty_containers(&self) -> Vec<ShopItem> {
        self.items().filter(|item| item.is_container()).collect()
    }

    pub fn has_empty_container(&self) -> bool {
        self.items().any(|item| item.is_container())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for item in ShopItem::ALL {
            assert!(item.bit() < 64);
            assert!(seen.insert(item.bit()));
            assert_eq!(ShopItem::from_bit(item.bit()), Some(item));
        }
    }

    #[test]
    fn test_inventory_words() {
        let mut inv = Inventory::default();
        inv.give(ShopItem::Map);
        inv.give(ShopItem::Pretzel);
        assert_eq!(inv.standard, 1 << 2);
        assert_eq!(inv.extra, 1 << 0);
        assert!(inv.has(ShopItem::Pretzel));
        inv.remove(ShopItem::Map);
        assert!(!inv.has(ShopItem::Map));
        assert_eq!(inv.standard, 0);
    }

    #[test]
    fn test_food_detection() {
        let mut inv = Inventory::default();
        inv.give(ShopItem::Balloon);
        assert!(!inv.has_food_or_drink());
        inv.give(ShopItem::Coffee);
        inv.give(ShopItem::Burger);
        assert_eq!(inv.food_or_drink(), Some(ShopItem::Burger));
        assert!(inv.has_drink());
    }

    #[test]
    fn test_containers_have_no_value() {
        for item in ShopItem::ALL.iter().filter(|i| i.is_container()) {
            let d = item.descriptor();
            assert_eq!(d.base_value, 0);
            assert!(d.discard_container.is_none());
        }
    }

    #[test]
    fn test_food_discards_into_containers() {
        for item in ShopItem::ALL {
            if let Some(container) = item.descriptor().discard_container {
                assert!(item.is_food_or_drink());
                assert!(container.is_container());
            }
        }
    }
}
