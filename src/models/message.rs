//! Message models.

use crate::cell::*;
use crate::dict::Dict;
use crate::error::Error;
use crate::num::*;

use super::address::{load_opt_ext_addr, store_opt_ext_addr, ExtAddr, IntAddr};

/// Blockchain message.
///
/// ```text
/// message$_ {X:Type} info:CommonMsgInfo
///   init:(Maybe (Either StateInit ^StateInit))
///   body:(Either X ^X) = Message X;
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Message {
    /// Message info.
    pub info: MsgInfo,
    /// Optional state init.
    pub init: Option<StateInit>,
    /// Message payload.
    pub body: Cell,
    /// Message layout.
    pub layout: MessageLayout,
}

impl Message {
    /// Returns the external out message destination and body if this is one.
    pub fn as_ext_out(&self) -> Option<(&ExtOutMsgInfo, &Cell)> {
        match &self.info {
            MsgInfo::ExtOut(info) => Some((info, &self.body)),
            _ => None,
        }
    }
}

impl Store for Message {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(self.info.store_into(builder));

        match &self.init {
            Some(init) => {
                ok!(builder.store_bit_one()); // just$1
                if self.layout.init_to_cell {
                    ok!(builder.store_bit_one()); // right$1
                    ok!(builder.store_reference(ok!(CellBuilder::build_from(init))));
                } else {
                    ok!(builder.store_bit_zero()); // left$0
                    ok!(init.store_into(builder));
                }
            }
            None => ok!(builder.store_bit_zero()), // nothing$0
        }

        if self.layout.body_to_cell {
            ok!(builder.store_bit_one());
            builder.store_reference(self.body.clone())
        } else {
            ok!(builder.store_bit_zero());
            builder.store_slice(&self.body.as_slice())
        }
    }
}

impl<'a> Load<'a> for Message {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let info = ok!(MsgInfo::load_from(slice));

        let (init, init_to_cell) = if ok!(slice.load_bit()) {
            if ok!(slice.load_bit()) {
                let cell = ok!(slice.load_reference());
                (Some(ok!(cell.parse::<StateInit>())), true)
            } else {
                (Some(ok!(StateInit::load_from(slice))), false)
            }
        } else {
            (None, false)
        };

        let body_to_cell = ok!(slice.load_bit());
        let body = if body_to_cell {
            ok!(slice.load_reference_cloned())
        } else {
            let mut builder = CellBuilder::new();
            ok!(builder.store_slice(slice));
            ok!(slice.skip_first(slice.remaining_bits(), slice.remaining_refs()));
            ok!(builder.build())
        };

        Ok(Self {
            info,
            init,
            body,
            layout: MessageLayout {
                init_to_cell,
                body_to_cell,
            },
        })
    }
}

/// Message payload layout.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct MessageLayout {
    /// Whether to store state init in a child cell.
    pub init_to_cell: bool,
    /// Whether to store payload as a child cell.
    pub body_to_cell: bool,
}

impl MessageLayout {
    /// Returns a layout which stores everything in child cells.
    pub const fn plain() -> Self {
        Self {
            init_to_cell: true,
            body_to_cell: true,
        }
    }
}

/// Message info.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MsgInfo {
    /// Internal message info,
    Int(IntMsgInfo),
    /// External incoming message info.
    ExtIn(ExtInMsgInfo),
    /// External outgoing message info,
    ExtOut(ExtOutMsgInfo),
}

impl Store for MsgInfo {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        match self {
            Self::Int(info) => {
                ok!(builder.store_bit_zero());
                info.store_into(builder)
            }
            Self::ExtIn(info) => {
                ok!(builder.store_small_uint(0b10, 2));
                info.store_into(builder)
            }
            Self::ExtOut(info) => {
                ok!(builder.store_small_uint(0b11, 2));
                info.store_into(builder)
            }
        }
    }
}

impl<'a> Load<'a> for MsgInfo {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(if !ok!(slice.load_bit()) {
            Self::Int(ok!(IntMsgInfo::load_from(slice)))
        } else if !ok!(slice.load_bit()) {
            Self::ExtIn(ok!(ExtInMsgInfo::load_from(slice)))
        } else {
            Self::ExtOut(ok!(ExtOutMsgInfo::load_from(slice)))
        })
    }
}

/// Internal message info.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct IntMsgInfo {
    /// Whether IHR is disabled for the message.
    pub ihr_disabled: bool,
    /// Whether to bounce this message back if the destination transaction fails.
    pub bounce: bool,
    /// Whether this message is a bounced message from some failed transaction.
    pub bounced: bool,
    /// Internal source address.
    pub src: IntAddr,
    /// Internal destination address.
    pub dst: IntAddr,
    /// Attached amounts.
    pub value: CurrencyCollection,
    /// IHR fee.
    pub ihr_fee: Tokens,
    /// Forwarding fee paid for using the routing.
    pub fwd_fee: Tokens,
    /// Logical time when the message was created.
    pub created_lt: u64,
    /// Unix timestamp when the message was created.
    pub created_at: u32,
}

impl Default for IntMsgInfo {
    fn default() -> Self {
        Self {
            ihr_disabled: true,
            bounce: false,
            bounced: false,
            src: Default::default(),
            dst: Default::default(),
            value: CurrencyCollection::default(),
            ihr_fee: Default::default(),
            fwd_fee: Default::default(),
            created_lt: 0,
            created_at: 0,
        }
    }
}

impl Store for IntMsgInfo {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let flags =
            ((self.ihr_disabled as u8) << 2) | ((self.bounce as u8) << 1) | self.bounced as u8;
        ok!(builder.store_small_uint(flags, 3));
        ok!(self.src.store_into(builder));
        ok!(self.dst.store_into(builder));
        ok!(self.value.store_into(builder));
        ok!(self.ihr_fee.store_into(builder));
        ok!(self.fwd_fee.store_into(builder));
        ok!(builder.store_u64(self.created_lt));
        builder.store_u32(self.created_at)
    }
}

impl<'a> Load<'a> for IntMsgInfo {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let flags = ok!(slice.load_small_uint(3));
        Ok(Self {
            ihr_disabled: flags & 0b100 != 0,
            bounce: flags & 0b010 != 0,
            bounced: flags & 0b001 != 0,
            src: ok!(IntAddr::load_from(slice)),
            dst: ok!(IntAddr::load_from(slice)),
            value: ok!(CurrencyCollection::load_from(slice)),
            ihr_fee: ok!(Tokens::load_from(slice)),
            fwd_fee: ok!(Tokens::load_from(slice)),
            created_lt: ok!(slice.load_u64()),
            created_at: ok!(slice.load_u32()),
        })
    }
}

/// External incoming message info.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct ExtInMsgInfo {
    /// Optional external source address.
    pub src: Option<ExtAddr>,
    /// Internal destination address.
    pub dst: IntAddr,
    /// External message import fee.
    pub import_fee: Tokens,
}

impl Store for ExtInMsgInfo {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(store_opt_ext_addr(&self.src, builder));
        ok!(self.dst.store_into(builder));
        self.import_fee.store_into(builder)
    }
}

impl<'a> Load<'a> for ExtInMsgInfo {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            src: ok!(load_opt_ext_addr(slice)),
            dst: ok!(IntAddr::load_from(slice)),
            import_fee: ok!(Tokens::load_from(slice)),
        })
    }
}

/// External outgoing message info.
///
/// Contracts emit events as external out messages: the destination
/// carries the event topic and the body carries the event payload.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct ExtOutMsgInfo {
    /// Internal source address.
    pub src: IntAddr,
    /// Optional external address.
    pub dst: Option<ExtAddr>,
    /// Logical time when the message was created.
    pub created_lt: u64,
    /// Unix timestamp when the message was created.
    pub created_at: u32,
}

impl Store for ExtOutMsgInfo {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(self.src.store_into(builder));
        ok!(store_opt_ext_addr(&self.dst, builder));
        ok!(builder.store_u64(self.created_lt));
        builder.store_u32(self.created_at)
    }
}

impl<'a> Load<'a> for ExtOutMsgInfo {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            src: ok!(IntAddr::load_from(slice)),
            dst: ok!(load_opt_ext_addr(slice)),
            created_lt: ok!(slice.load_u64()),
            created_at: ok!(slice.load_u32()),
        })
    }
}

/// Amounts collection.
///
/// ```text
/// currencies$_ grams:Grams other:ExtraCurrencyCollection = CurrencyCollection;
/// ```
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct CurrencyCollection {
    /// Amount in native currency.
    pub tokens: Tokens,
    /// Amounts in other currencies.
    pub other: Dict<u32, VarUint32>,
}

impl CurrencyCollection {
    /// Creates a new currency collection with only native tokens.
    pub const fn new(tokens: u128) -> Self {
        Self {
            tokens: Tokens::new(tokens),
            other: Dict::new(),
        }
    }
}

impl Store for CurrencyCollection {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(self.tokens.store_into(builder));
        self.other.store_into(builder)
    }
}

impl<'a> Load<'a> for CurrencyCollection {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            tokens: ok!(Tokens::load_from(slice)),
            other: ok!(Dict::load_from(slice)),
        })
    }
}

/// Deployed account state.
///
/// ```text
/// _ split_depth:(Maybe (## 5)) special:(Maybe TickTock)
///   code:(Maybe ^Cell) data:(Maybe ^Cell)
///   library:(HashmapE 256 SimpleLib) = StateInit;
/// ```
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct StateInit {
    /// Optional split depth for large smart contracts.
    pub split_depth: Option<u8>,
    /// Optional special contract flags.
    pub special: Option<SpecialFlags>,
    /// Optional contract code.
    pub code: Option<Cell>,
    /// Optional contract data.
    pub data: Option<Cell>,
    /// Libraries used in smart-contract.
    pub libraries: Dict<HashBytes, SimpleLib>,
}

impl StateInit {
    /// Computes the address hash of the contract deployed with this state.
    pub fn compute_address(&self, workchain: i8) -> Result<super::StdAddr, Error> {
        let cell = ok!(CellBuilder::build_from(self));
        Ok(super::StdAddr::new(workchain, *cell.repr_hash()))
    }
}

impl Store for StateInit {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        match self.split_depth {
            Some(depth) if depth < 32 => {
                ok!(builder.store_bit_one());
                ok!(builder.store_small_uint(depth, 5));
            }
            Some(_) => return Err(Error::IntOverflow),
            None => ok!(builder.store_bit_zero()),
        }
        ok!(self.special.store_into(builder));
        ok!(self.code.store_into(builder));
        ok!(self.data.store_into(builder));
        self.libraries.store_into(builder)
    }
}

impl<'a> Load<'a> for StateInit {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let split_depth = if ok!(slice.load_bit()) {
            Some(ok!(slice.load_small_uint(5)))
        } else {
            None
        };

        Ok(Self {
            split_depth,
            special: ok!(Option::<SpecialFlags>::load_from(slice)),
            code: ok!(Option::<Cell>::load_from(slice)),
            data: ok!(Option::<Cell>::load_from(slice)),
            libraries: ok!(Dict::load_from(slice)),
        })
    }
}

/// Special transactions execution flags.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct SpecialFlags {
    /// Account will be called at the beginning of each block.
    pub tick: bool,
    /// Account will be called at the end of each block.
    pub tock: bool,
}

impl Store for SpecialFlags {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_small_uint(((self.tick as u8) << 1) | self.tock as u8, 2)
    }
}

impl<'a> Load<'a> for SpecialFlags {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let data = ok!(slice.load_small_uint(2));
        Ok(Self {
            tick: data & 0b10 != 0,
            tock: data & 0b01 != 0,
        })
    }
}

/// Simple TVM library.
///
/// ```text
/// simple_lib$_ public:Bool root:^Cell = SimpleLib;
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SimpleLib {
    /// Whether this library is accessible from other accounts.
    pub public: bool,
    /// Library code.
    pub root: Cell,
}

impl Store for SimpleLib {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_bit(self.public));
        builder.store_reference(self.root.clone())
    }
}

impl<'a> Load<'a> for SimpleLib {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            public: ok!(slice.load_bit()),
            root: ok!(slice.load_reference_cloned()),
        })
    }
}
