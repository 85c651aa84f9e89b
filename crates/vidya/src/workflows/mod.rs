pub mod admit_card;
