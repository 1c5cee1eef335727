mod closed_loop;
mod decoder_sequences;
mod encoder_wiring;
mod pid_loop;
