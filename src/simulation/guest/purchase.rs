//! Paying for things: stalls, facilities, cash machines

use crate::core::types::{direction_reverse, Money, RideId, StationIndex};
use crate::entity::agent::{ActionKind, Peep, PeepState, RideSubState, RideVisit};
use crate::entity::guest::{GuestData, GuestFlags, SpendCategory};
use crate::entity::items::ShopItem;
use crate::entity::needs::clamp_u8;
use crate::entity::thoughts::{ThoughtSubject, ThoughtType};
use crate::park::notify::Notification;
use crate::park::rides::{ExpenditureType, RideClass, RideInfo};
use crate::simulation::context::TickContext;
use crate::simulation::guest::ride_select::{should_go_on_ride, stop_purchase_thought};
use crate::simulation::movement::{check_for_path, return_to_centre_of_tile, update_action};
use crate::simulation::tick::SimulationEvent;

/// Cash a guest withdraws from a cash machine
pub const CASH_MACHINE_WITHDRAWAL: Money = 500;

/// Guests holding more than this never use a cash machine
const CASH_MACHINE_CEILING: Money = 200;

/// Hand over money, clamping the purse at zero
///
/// Callers skip this entirely in parks without money.
pub fn spend_money(
    guest: &mut GuestData,
    amount: Money,
    category: SpendCategory,
    expenditure: ExpenditureType,
    ctx: &mut TickContext,
) {
    guest.cash_in_pocket = (guest.cash_in_pocket - amount).max(0);
    guest.cash_spent += amount;
    guest.spent.record(category, amount);
    ctx.park.finance_payment(-amount, expenditure);
}

/// Item value as perceived at the current temperature
pub fn perceived_value(item: ShopItem, temperature: i8) -> Money {
    let descriptor = item.descriptor();
    if temperature >= 21 {
        descriptor.hot_value
    } else if temperature <= 11 {
        descriptor.cold_value
    } else {
        descriptor.base_value
    }
}

/// Weigh an item against its price and buy it if the guest is willing
pub fn decide_and_buy_item(
    guest: &mut GuestData,
    ride: &RideInfo,
    item: ShopItem,
    price: Money,
    ctx: &mut TickContext,
) -> bool {
    let raining = ctx.raining();
    let temperature = ctx.temperature();
    let no_money = ctx.no_money();
    let umbrella_in_rain = item == ShopItem::Umbrella && raining;
    let has_voucher = guest.has_item_voucher(item);

    if guest.items.has(item) {
        guest
            .thoughts
            .insert(ThoughtType::AlreadyGot, ThoughtSubject::Item(item));
        return false;
    }

    if item.is_food_or_drink() {
        if let Some(held) = guest.items.food_or_drink() {
            guest
                .thoughts
                .insert(ThoughtType::HaventFinished, ThoughtSubject::Item(held));
            return false;
        }
        if guest.needs.nausea >= 145 {
            return false;
        }
    }

    let fair_weather_item = matches!(
        item,
        ShopItem::Balloon | ShopItem::IceCream | ShopItem::Candyfloss | ShopItem::Sunglasses
    );
    if fair_weather_item && raining {
        return false;
    }
    if matches!(item, ShopItem::Sunglasses | ShopItem::IceCream) && temperature < 12 {
        return false;
    }

    if item.is_food() && guest.needs.hunger > 75 {
        guest
            .thoughts
            .insert(ThoughtType::NotHungry, ThoughtSubject::None);
        return false;
    }
    if item.is_drink() && guest.needs.thirst > 75 {
        guest
            .thoughts
            .insert(ThoughtType::NotThirsty, ThoughtSubject::None);
        return false;
    }

    if !umbrella_in_rain && item != ShopItem::Map && item.is_souvenir() && !has_voucher {
        let threshold = (ctx.rand() & 0x7F) as i32 + 0x73;
        if threshold > guest.needs.happiness as i32 || guest.num_rides < 3 {
            return false;
        }
    }

    if !has_voucher {
        if price != 0 && !no_money {
            if guest.cash_in_pocket == 0 {
                guest
                    .thoughts
                    .insert(ThoughtType::SpentMoney, ThoughtSubject::None);
                return false;
            }
            if price > guest.cash_in_pocket {
                guest
                    .thoughts
                    .insert(ThoughtType::CantAffordItem, ThoughtSubject::Item(item));
                return false;
            }
        }

        let value = perceived_value(item, temperature);
        if value < price {
            if !umbrella_in_rain {
                let mut overprice = price - value;
                if guest.needs.happiness >= 128 {
                    overprice /= 2;
                    if guest.needs.happiness >= 180 {
                        overprice /= 2;
                    }
                }
                if overprice > (ctx.rand() & 7) as Money {
                    guest
                        .thoughts
                        .insert(ThoughtType::BadValue, ThoughtSubject::Item(item));
                    return false;
                }
            }
        } else {
            let bargain = (value - price).max(8);
            if !no_money && bargain >= (ctx.rand() & 7) as Money {
                guest
                    .thoughts
                    .insert(ThoughtType::GoodValue, ThoughtSubject::Item(item));
            }
            let growth = bargain * 4;
            guest.needs.happiness_target = clamp_u8(guest.needs.happiness_target as i32 + growth);
            guest.needs.happiness = clamp_u8(guest.needs.happiness as i32 + growth);
        }

        let margin = value - price;
        let satisfaction = match margin {
            m if m > 3 => 3,
            m if m > -3 => 2,
            m if m > -8 => 1,
            _ => 0,
        };
        ctx.park.update_satisfaction(ride.id, satisfaction);
    }

    guest.items.give(item);
    let descriptor = item.descriptor();
    guest.time_to_consume = guest
        .time_to_consume
        .saturating_add(descriptor.consumption_time);

    if guest.flags.contains(GuestFlags::TRACKING) {
        ctx.post(Notification::GuestBought {
            guest: ctx.handle,
            item,
        });
    }

    let (category, stock, sales) = if item.is_food() {
        guest.num_food = guest.num_food.saturating_add(1);
        (
            SpendCategory::Food,
            ExpenditureType::FoodDrinkStock,
            ExpenditureType::FoodDrinkSales,
        )
    } else if item.is_drink() {
        guest.num_drinks = guest.num_drinks.saturating_add(1);
        (
            SpendCategory::Drink,
            ExpenditureType::FoodDrinkStock,
            ExpenditureType::FoodDrinkSales,
        )
    } else {
        if item.is_souvenir() {
            guest.num_souvenirs = guest.num_souvenirs.saturating_add(1);
        }
        (
            SpendCategory::Souvenirs,
            ExpenditureType::ShopStock,
            ExpenditureType::ShopSales,
        )
    };

    if !no_money {
        ctx.park.finance_payment(descriptor.cost, stock);
    }
    if has_voucher {
        guest.remove_voucher();
    } else if !no_money {
        spend_money(guest, price, category, sales, ctx);
    }
    ctx.park.add_income(ride.id, price - descriptor.cost);
    ctx.park.add_customer(ride.id);

    tracing::trace!("Guest {:?} bought {:?} for {}", ctx.handle, item, price);
    ctx.emit(SimulationEvent::ItemBought {
        guest: ctx.handle,
        ride: ride.id,
        item,
        price,
    });
    true
}

/// Whether a short-of-cash guest withdraws money
fn should_use_cash_machine(peep: &Peep, guest: &GuestData, ride: RideId, ctx: &mut TickContext) -> bool {
    if ctx.no_money() || guest.is_leaving() || guest.cash_in_pocket > CASH_MACHINE_CEILING {
        return false;
    }
    if 115 + ctx.rng.next_max(128) as i32 > guest.needs.happiness as i32 {
        return false;
    }
    if peep.energy < 80 {
        return false;
    }

    ctx.park.update_satisfaction(ride, guest.needs.happiness >> 6);
    ctx.park.add_customer(ride);
    true
}

/// A walking guest steps up to a stall or facility
pub fn interact_with_shop(peep: &mut Peep, guest: &mut GuestData, ride_id: RideId, ctx: &mut TickContext) {
    if peep.state.is_queuing() {
        return;
    }
    guest.time_lost = 0;

    let Some(ride) = ctx.park.ride(ride_id).cloned() else {
        return_to_centre_of_tile(peep);
        return;
    };
    if !ride.is_open() || guest.is_leaving() {
        return_to_centre_of_tile(peep);
        return;
    }

    if ride.class.is_facility() {
        if !should_go_on_ride(guest, &ride, StationIndex(0), false, false, ctx) {
            return_to_centre_of_tile(peep);
            return;
        }

        let cost = ride.ride_price();
        if cost != 0 && !ctx.no_money() {
            ctx.park.add_income(ride_id, cost);
            spend_money(
                guest,
                cost,
                SpendCategory::Rides,
                ExpenditureType::ParkRideTickets,
                ctx,
            );
        }

        let centre = peep.destination.loc;
        peep.set_destination(centre, 3);
        peep.set_state(PeepState::EnteringRide {
            visit: RideVisit::new(ride_id, StationIndex(0)),
            sub: RideSubState::ApproachShop,
        });
        guest.time_on_ride = 0;
        if guest.flags.contains(GuestFlags::TRACKING) {
            ctx.post(Notification::GuestOnRide {
                guest: ctx.handle,
                ride: ride_id,
            });
        }
        return;
    }

    if guest.heading_to_ride == Some(ride_id) {
        guest.heading_to_ride = None;
    }
    // Stalls are served across the counter from the current tile
    let here = peep.next.loc.xy().to_tile_centre();
    peep.set_destination(here, 2);
    peep.set_state(PeepState::Buying {
        ride: ride_id,
        resolved: false,
    });
}

/// Buy from the stall once, then turn around and walk on
pub fn update_buying(
    peep: &mut Peep,
    guest: &mut GuestData,
    ctx: &mut TickContext,
    ride_id: RideId,
    resolved: bool,
) {
    if !check_for_path(peep, &*ctx.park) {
        return;
    }

    let Some(ride) = ctx.park.ride(ride_id).filter(|r| r.is_open()).cloned() else {
        peep.set_state(PeepState::Falling);
        return;
    };

    if resolved {
        if !peep.is_action_walking() {
            update_action(peep);
            return;
        }
        if ride.class == RideClass::CashMachine && guest.previous_ride != Some(ride_id) {
            guest.cash_in_pocket += CASH_MACHINE_WITHDRAWAL;
        }
        let here = peep.next.loc.xy().to_tile_centre();
        peep.set_destination(here, 2);
        peep.direction = direction_reverse(peep.direction);
        peep.set_state(PeepState::Walking);
        return;
    }

    let mut bought = false;
    if guest.previous_ride != Some(ride_id) {
        if ride.class == RideClass::CashMachine {
            bought = should_use_cash_machine(peep, guest, ride_id, ctx);
            if bought {
                peep.start_action(ActionKind::WithdrawMoney);
                ctx.park.record_sale(ride_id, false);
            } else {
                guest.previous_ride = Some(ride_id);
                guest.previous_ride_timeout = 0;
            }
        } else {
            if let Some(item) = ride.items[1] {
                bought = decide_and_buy_item(guest, &ride, item, ride.price[1], ctx);
                if bought {
                    ctx.park.record_sale(ride_id, true);
                }
            }
            if !bought {
                if let Some(item) = ride.items[0] {
                    bought = decide_and_buy_item(guest, &ride, item, ride.price[0], ctx);
                    if bought {
                        ctx.park.record_sale(ride_id, false);
                    }
                }
            }
        }
    }

    ctx.park.update_popularity(ride_id, bought);
    if bought {
        stop_purchase_thought(guest, &ride);
    }
    peep.set_state(PeepState::Buying {
        ride: ride_id,
        resolved: true,
    });
}
