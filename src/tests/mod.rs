mod custom;
mod helper;
mod lookup;
